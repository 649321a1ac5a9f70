use crate::commands::CommandResult;
use linebook_core::config::{AppConfig, LoadOptions};
use linebook_db::{connect_with_settings, migrations, DemoPriceBook, SeedVerification};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        DemoPriceBook::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoPriceBook::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let expected = DemoPriceBook::entries();
        let expected_aliases: usize = expected.iter().map(|entry| entry.aliases.len()).sum();
        let run_result: Result<SeedVerification, (&'static str, String, u8)> =
            if verification.entry_count != expected.len() as i64
                || verification.alias_count != expected_aliases as i64
            {
                Err((
                    "seed_verification",
                    verification_failure_message(&verification, expected.len(), expected_aliases),
                    6u8,
                ))
            } else {
                Ok(verification)
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(verification) => CommandResult::success(
            "seed",
            format!(
                "demo price book loaded: {} catalog entries, {} aliases",
                verification.entry_count, verification.alias_count
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(
    verification: &SeedVerification,
    expected_entries: usize,
    expected_aliases: usize,
) -> String {
    format!(
        "seed verification failed: expected {expected_entries} entries and {expected_aliases} aliases, found {} and {}",
        verification.entry_count, verification.alias_count
    )
}

#[cfg(test)]
mod tests {
    use linebook_db::SeedVerification;

    use super::verification_failure_message;

    #[test]
    fn verification_message_names_expected_and_actual_counts() {
        let verification = SeedVerification { entry_count: 4, alias_count: 3 };

        let message = verification_failure_message(&verification, 4, 8);

        assert_eq!(
            message,
            "seed verification failed: expected 4 entries and 8 aliases, found 4 and 3"
        );
    }
}
