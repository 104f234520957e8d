use std::fs;

use serde::{Deserialize, Serialize};
use signet::crypto::KeyPair;

#[derive(Serialize, Deserialize)]
struct OwnerKeyFile {
    address: String,
    secret_key: String,
    mnemonic: String,
}

fn main() {
    println!("=== Signet Owner Key Generator ===\n");

    let mnemonic = KeyPair::generate_mnemonic();
    let keypair = match KeyPair::from_mnemonic(&mnemonic) {
        Ok(kp) => kp,
        Err(e) => {
            eprintln!("Key derivation failed: {}", e);
            std::process::exit(1);
        }
    };

    let address = format!("{}", keypair.address());
    let secret_hex = keypair.secret_hex();

    println!("Generated Owner Keypair:");
    println!("Address:    {}", address);
    println!("Secret Key: {} (KEEP SECRET!)", secret_hex);
    println!("Mnemonic:   {} (KEEP SECRET!)\n", mnemonic);

    let file = OwnerKeyFile {
        address: address.clone(),
        secret_key: secret_hex,
        mnemonic,
    };
    let json = serde_json::to_string_pretty(&file).expect("key file serializes");
    fs::write("owner_key.json", json).expect("Failed to write owner_key.json");
    println!("✓ Saved to owner_key.json");

    fs::write("owner_address.txt", address).expect("Failed to write owner_address.txt");
    println!("✓ Saved address to owner_address.txt");

    println!("\n⚠️  IMPORTANT:");
    println!("1. Keep owner_key.json secure (it signs forwarded calls)");
    println!("2. Hand the address to whoever provisions your identity pair");
    println!("3. The mnemonic alone restores the key (m/44'/60'/0'/0/0)");
}
