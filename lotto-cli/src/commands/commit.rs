use anyhow::{bail, Context};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Password;
use lotto_core::{Salt, H256};
use lotto_engine::commitment::{self, verify_iteration_binding, verify_salt_chain};
use lotto_engine::{CommitmentPair, PickDerivation, PreimageDerivation, Reveal};

/// Derives the commitments a curator publishes for a new round
pub fn commit(phrase: Option<String>, salt: Option<String>, iterations: u8) -> anyhow::Result<()> {
    if iterations == 0 {
        bail!("Iterations must be at least 1");
    }

    let salt = match (phrase, salt) {
        (Some(_), Some(_)) => bail!("Pass either --phrase or --salt, not both"),
        (Some(phrase), None) => commitment::salt_from_phrase(&phrase),
        (None, Some(hex)) => hex.parse::<Salt>().context("Invalid salt")?,
        (None, None) => {
            let phrase = Password::new()
                .with_prompt("Enter secret phrase")
                .with_confirmation("Confirm secret phrase", "Phrases do not match")
                .interact()
                .context("Failed to read secret phrase")?;
            commitment::salt_from_phrase(&phrase)
        }
    };

    let reveal = Reveal::new(salt, iterations);
    let pair = CommitmentPair::for_reveal(&reveal);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Salt".to_string(), salt.to_string()]);
    table.add_row(vec!["Iterations".to_string(), iterations.to_string()]);
    table.add_row(vec!["Salt hash".to_string(), pair.salt_hash.to_string()]);
    table.add_row(vec!["Salt-N hash".to_string(), pair.salt_n_hash.to_string()]);
    table.add_row(vec![
        "Winning pick".to_string(),
        PreimageDerivation.derive(&reveal).to_string(),
    ]);
    println!("{table}");

    println!();
    println!("IMPORTANT: Keep the salt secret until the round closes!");
    println!("Publish only the salt hash and salt-N hash.");
    Ok(())
}

/// Checks a revealed salt and chain length against published commitments
pub fn verify(salt: &str, iterations: u8, salt_hash: &str, salt_n_hash: &str) -> anyhow::Result<()> {
    let salt: Salt = salt.parse().context("Invalid salt")?;
    let salt_hash: H256 = salt_hash.parse().context("Invalid salt hash")?;
    let salt_n_hash: H256 = salt_n_hash.parse().context("Invalid salt-N hash")?;

    let chain_ok = verify_salt_chain(&salt, iterations, &salt_hash);
    let binding_ok = verify_iteration_binding(&salt, iterations, &salt_n_hash);

    println!("Salt chain:        {}", if chain_ok { "ok" } else { "MISMATCH" });
    println!("Iteration binding: {}", if binding_ok { "ok" } else { "MISMATCH" });

    if !(chain_ok && binding_ok) {
        bail!("Reveal does not match the commitments");
    }

    let pick = PreimageDerivation.derive(&Reveal::new(salt, iterations));
    println!("Winning pick:      {}", pick);
    Ok(())
}
