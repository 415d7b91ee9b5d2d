//! Example rule sets a group's rules can be prefilled from.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rules: &'static str,
}

pub const RULE_TEMPLATES: &[RuleTemplate] = &[
    RuleTemplate {
        key: "natural_conversation",
        name: "Natural conversation",
        description: "Encourage natural back-and-forth between participants",
        rules: "- Several AIs (LLMs) and humans take part in this conversation
- No explanations or lectures, talk like friends do
- Always react to what the previous speaker said
- Ask questions and bring up new topics
- Keep it casual rather than formal
- One or two sentences, avoid long explanations
- Call the others by name",
    },
    RuleTemplate {
        key: "shiritori_game",
        name: "Shiritori",
        description: "Word chain game",
        rules: "- Let's all play shiritori
- Whoever answers with a word ending in \"n\" loses
- Keep it fun and lively",
    },
    RuleTemplate {
        key: "debate_style",
        name: "Debate",
        description: "Constructive discussion",
        rules: "- Respect the other side, open with \"I see\" or \"interesting point\"
- Always give one reason or concrete example
- Disagree constructively
- Stay calm, never get emotional
- Ask questions that deepen the discussion",
    },
    RuleTemplate {
        key: "creative_story",
        name: "Creative story",
        description: "Build a story together",
        rules: "- Always continue from the previous speaker's part
- Add new characters and twists
- Link turns with \"and then\" or \"but suddenly\"
- Imagination over realism
- Never reject someone else's idea",
    },
    RuleTemplate {
        key: "casual_chat",
        name: "Casual chat",
        description: "Light everyday small talk",
        rules: "- Open naturally, like \"so today...\" or \"by the way\"
- Empathize with \"I know right!\" or \"that happens\"
- Share your own experiences and impressions
- When a topic runs out, bring up another
- Show feelings with emoji and exclamation marks",
    },
    RuleTemplate {
        key: "roleplay",
        name: "Roleplay",
        description: "Stay in character",
        rules: "- Speak fully as your assigned character
- Use the words and reactions that character would
- Answer from the character's point of view, not real-world knowledge
- Keep the relationships between characters in mind
- Enjoy the act and never break character",
    },
    RuleTemplate {
        key: "quick_response",
        name: "Quick response",
        description: "Short, fast-paced exchanges",
        rules: "- Answer in one sentence at most
- React on instinct, don't overthink
- Short replies like \"yeah\", \"totally\", \"really?\"
- Jumping between topics is fine
- Keep the tempo up",
    },
];

pub fn find_template(key: &str) -> Option<&'static RuleTemplate> {
    RULE_TEMPLATES.iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_finds_templates_by_key() {
        let template = find_template("debate_style").unwrap();
        assert_eq!(template.name, "Debate");
        assert!(find_template("unknown").is_none());
    }

    #[test]
    fn test_template_keys_are_unique() {
        let mut keys: Vec<_> = RULE_TEMPLATES.iter().map(|t| t.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), RULE_TEMPLATES.len());
    }
}
