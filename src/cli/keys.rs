use anyhow::{Result, bail};

use crate::core::AppConfig;
use crate::credentials::{CredentialStore, Credentials, PROVIDERS};

fn load(store: &CredentialStore) -> Credentials {
    let loaded = store.load();
    if let Some(warning) = loaded.warning {
        eprintln!("Warning: {}", warning);
    }
    loaded.credentials
}

pub fn show(config: &AppConfig) {
    let store = CredentialStore::new(&config.credentials_path);
    let creds = load(&store);
    for provider in PROVIDERS {
        println!("{:<8} {}", provider, creds.masked(provider));
    }
    println!(
        "\nKeys are stored base64 encoded, not encrypted, in {}",
        store.path().display()
    );
}

pub fn set(config: &AppConfig, provider: &str, key: &str) -> Result<()> {
    let store = CredentialStore::new(&config.credentials_path);
    let mut creds = load(&store);
    if !creds.set(provider, key) {
        bail!(
            "Unknown provider {}, expected one of: {}",
            provider,
            PROVIDERS.join(", ")
        );
    }
    store.save(&creds)?;
    println!("Saved key for {}", provider);
    Ok(())
}

pub fn clear(config: &AppConfig, provider: &str) -> Result<()> {
    let store = CredentialStore::new(&config.credentials_path);
    let mut creds = load(&store);
    if !creds.clear(provider) {
        bail!("Unknown provider {}", provider);
    }
    store.save(&creds)?;
    println!("Removed key for {}", provider);
    Ok(())
}
