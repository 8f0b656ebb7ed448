//! Tests for the multisig pipeline
//!
//! Runs every stage against the in-memory ledger, so the native script is
//! enforced on submission just as it would be on chain.

#[cfg(test)]
mod tests {
    use crate::{
        ledger::{InMemoryLedger, LedgerClient, LedgerError},
        pipeline::{
            generate_wallets, MultisigPipeline, PipelineError, ScenarioReport, SignerSet,
            SpendRequest,
        },
        registry::Registry,
        script::EncodedScript,
        tx::TxBuilder,
        validation::Validator,
        wallet::KeyDerivation,
        Identity, Network, Policy, SeedWallet, ValidationFailure,
    };
    use std::sync::Arc;

    const LOCKED: u64 = 100_000_000;
    const FEE_RESERVE: u64 = 2_000_000;
    const FEE: u64 = 200_000;

    /// Ledger, pipeline and five loaded signers
    fn setup() -> (InMemoryLedger, MultisigPipeline, SignerSet) {
        let ledger = InMemoryLedger::new();
        let pipeline = MultisigPipeline::new(
            Arc::new(ledger.clone()),
            Validator::default(),
            Network::Testnet,
            FEE,
        );
        let seeds: Vec<String> = generate_wallets(Network::Testnet, KeyDerivation::default(), 5)
            .unwrap()
            .into_iter()
            .map(|w| w.seed_json)
            .collect();
        let signers = pipeline.load_signers(&seeds).unwrap();
        (ledger, pipeline, signers)
    }

    /// Funds a fresh wallet and locks `LOCKED` lovelace at the script
    async fn lock(
        ledger: &InMemoryLedger,
        pipeline: &MultisigPipeline,
        signers: &SignerSet,
    ) -> (EncodedScript, SpendRequest) {
        let (funding, _) = SeedWallet::generate(Network::Testnet).unwrap();
        ledger.fund(funding.address(), 150_000_000).await;

        let script = pipeline.build_script(signers).unwrap();
        let receipt = pipeline.lock_funds(&funding, &script, LOCKED).await.unwrap();
        assert_eq!(receipt.out_ref.index, 0);
        assert_eq!(ledger.balance(&script.address).await, LOCKED);
        assert_eq!(ledger.balance(funding.address()).await, 150_000_000 - LOCKED - FEE);

        let request = SpendRequest {
            out_ref: receipt.out_ref,
            expected_lovelace: LOCKED,
            fee_reserve: FEE_RESERVE,
            slots: vec![1, 2, 3],
        };
        (script, request)
    }

    #[test]
    fn test_generated_wallets_are_distinct() {
        let wallets = generate_wallets(Network::Testnet, KeyDerivation::default(), 5).unwrap();

        assert_eq!(wallets.len(), 5);
        assert_eq!(wallets[4].slot, 5);
        assert!(wallets[0].env_line().starts_with("WALLET_SEEDS_1='[\""));
        for (i, a) in wallets.iter().enumerate() {
            assert!(a.address.as_str().starts_with("addr_test1"));
            for b in &wallets[i + 1..] {
                assert_ne!(a.address, b.address);
            }
        }
    }

    #[test]
    fn test_load_signers_requires_policy_total() {
        let (_, pipeline, signers) = setup();
        assert_eq!(signers.len(), 5);
        assert!(signers.get(0).is_none());
        assert!(signers.get(6).is_none());

        let seeds: Vec<String> = generate_wallets(Network::Testnet, KeyDerivation::default(), 4)
            .unwrap()
            .into_iter()
            .map(|w| w.seed_json)
            .collect();
        assert!(matches!(
            pipeline.load_signers(&seeds),
            Err(PipelineError::SignerSetSize { expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn test_script_commits_to_all_signers() {
        let (_, pipeline, signers) = setup();
        let script = pipeline.build_script(&signers).unwrap();

        assert_eq!(script.script.key_hashes(), signers.key_hashes());
        assert!(script.address.as_str().starts_with("addr_test1"));
        // Same keys give the same address
        assert_eq!(pipeline.build_script(&signers).unwrap().address, script.address);
    }

    #[test]
    fn test_scenario_report() {
        let (_, pipeline, signers) = setup();
        let report = pipeline.run_scenarios(&signers);

        assert_eq!(report.scenarios.len(), 5);
        assert_eq!(report.valid_count(), 1);
        assert_eq!(report.invalid_count(), 4);
        assert!(report.passed());
        assert!(report.scenarios[0].result.is_valid());
    }

    #[test]
    fn test_scenario_report_in_at_least_mode() {
        let ledger = InMemoryLedger::new();
        let pipeline = MultisigPipeline::new(
            Arc::new(ledger),
            Validator::default().with_exact_count(false),
            Network::Testnet,
            FEE,
        );
        let seeds: Vec<String> = generate_wallets(Network::Testnet, KeyDerivation::default(), 5)
            .unwrap()
            .into_iter()
            .map(|w| w.seed_json)
            .collect();
        let signers = pipeline.load_signers(&seeds).unwrap();
        let report = pipeline.run_scenarios(&signers);

        // Four signers now satisfy "at least three"
        assert_eq!(report.valid_count(), 2);
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_lock_and_spend_with_three_signers() {
        let (ledger, pipeline, signers) = setup();
        let (script, request) = lock(&ledger, &pipeline, &signers).await;

        let receipt = pipeline.spend(&signers, &script, &request).await.unwrap();
        assert_eq!(receipt.signers.len(), 3);
        assert_eq!(receipt.distribution.total(), LOCKED - FEE_RESERVE);

        let identities = signers.identities();
        // First signer takes the remainder plus the change
        assert_eq!(
            ledger.balance(&identities[0]).await,
            32_666_668 + (FEE_RESERVE - FEE)
        );
        assert_eq!(ledger.balance(&identities[1]).await, 32_666_666);
        assert_eq!(ledger.balance(&identities[2]).await, 32_666_666);
        assert_eq!(ledger.balance(&identities[3]).await, 0);
        assert_eq!(ledger.balance(&script.address).await, 0);
        assert_eq!(ledger.submitted().await.len(), 2);
    }

    #[tokio::test]
    async fn test_spend_with_other_signer_slots() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.slots = vec![5, 2, 4];

        pipeline.spend(&signers, &script, &request).await.unwrap();

        let identities = signers.identities();
        assert_eq!(ledger.balance(&identities[4]).await, 32_666_668 + 1_800_000);
        assert_eq!(ledger.balance(&identities[0]).await, 0);
    }

    #[tokio::test]
    async fn test_spend_with_two_signers_is_refused() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.slots = vec![1, 2];

        let err = pipeline.spend(&signers, &script, &request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Authorization(ValidationFailure::SignerCountMismatch { actual: 2, .. })
        ));
        // Nothing reached the ledger
        assert_eq!(ledger.balance(&script.address).await, LOCKED);
        assert_eq!(ledger.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_spend_with_duplicate_slot_is_refused() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.slots = vec![1, 2, 1];

        let err = pipeline.spend(&signers, &script, &request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Authorization(ValidationFailure::DuplicateSigner)
        ));
    }

    #[tokio::test]
    async fn test_spend_with_unknown_slot() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.slots = vec![1, 2, 9];

        let err = pipeline.spend(&signers, &script, &request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSlot { slot: 9, total: 5 }));
    }

    #[tokio::test]
    async fn test_spend_checks_locked_amount() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.expected_lovelace = 50_000_000;

        let err = pipeline.spend(&signers, &script, &request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AmountMismatch {
                expected: 50_000_000,
                found: LOCKED,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_spend_unknown_output() {
        let (ledger, pipeline, signers) = setup();
        let (script, mut request) = lock(&ledger, &pipeline, &signers).await;
        request.out_ref.index = 1;

        let err = pipeline.spend(&signers, &script, &request).await.unwrap_err();
        assert!(matches!(err, PipelineError::UtxoNotFound(_)));
    }

    #[tokio::test]
    async fn test_ledger_rejects_spend_below_threshold() {
        let (ledger, pipeline, signers) = setup();
        let (script, _) = lock(&ledger, &pipeline, &signers).await;

        // Build the spend by hand, skipping the off-chain validator
        let utxos = ledger.utxos(&script.address).await.unwrap();
        let mut tx = TxBuilder::new(FEE)
            .tx_out(signers.identities()[0].clone(), 90_000_000)
            .change_address(signers.identities()[0].clone())
            .select_utxos_from(utxos)
            .native_script(script.script.clone())
            .complete()
            .unwrap();
        for slot in [1, 2] {
            tx.sign_partial(signers.get(slot).unwrap()).unwrap();
        }

        let err = ledger.submit(&tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::ScriptNotSatisfied(hash) if hash == script.hash));
        assert_eq!(ledger.balance(&script.address).await, LOCKED);
    }

    #[tokio::test]
    async fn test_lock_receipt_round_trips_through_registry() {
        let (ledger, pipeline, signers) = setup();
        let (funding, _) = SeedWallet::generate(Network::Testnet).unwrap();
        ledger.fund(funding.address(), 120_000_000).await;
        let script = pipeline.build_script(&signers).unwrap();
        let receipt = pipeline.lock_funds(&funding, &script, LOCKED).await.unwrap();

        let registry = Registry::in_memory().await.unwrap();
        registry.store(&receipt.to_record()).await.unwrap();
        let record = registry.latest().await.unwrap().unwrap();

        assert_eq!(record.out_ref, receipt.out_ref);
        assert_eq!(record.lovelace, LOCKED);
        let restored = EncodedScript::from_cbor(&hex::decode(&record.script_cbor).unwrap(), Network::Testnet)
            .unwrap();
        assert_eq!(restored.address, script.address);
        assert!(receipt.env_lines()[0].starts_with("MULTISIG_UTXO_HASH="));
    }

    #[tokio::test]
    async fn test_lock_without_funds() {
        let (_, pipeline, signers) = setup();
        let (funding, _) = SeedWallet::generate(Network::Testnet).unwrap();
        let script = pipeline.build_script(&signers).unwrap();

        let err = pipeline.lock_funds(&funding, &script, LOCKED).await.unwrap_err();
        assert!(matches!(err, PipelineError::Tx(_)));
    }

    #[test]
    fn test_custom_policy_script() {
        let pipeline = MultisigPipeline::new(
            Arc::new(InMemoryLedger::new()),
            Validator::new(Policy::new(2, 3).unwrap()),
            Network::Testnet,
            FEE,
        );
        let seeds: Vec<String> = generate_wallets(Network::Testnet, KeyDerivation::default(), 3)
            .unwrap()
            .into_iter()
            .map(|w| w.seed_json)
            .collect();
        let signers = pipeline.load_signers(&seeds).unwrap();

        assert!(pipeline.authorize(&signers, &[3, 1]).is_ok());
        assert!(pipeline.authorize(&signers, &[3]).is_err());
        let script = pipeline.build_script(&signers).unwrap();
        assert_eq!(script.script.key_hashes().len(), 3);
    }

    fn identities(count: usize) -> Vec<Identity> {
        (1..=count).map(|i| Identity::new(format!("addr_test1signer{}", i))).collect()
    }

    #[test]
    fn test_scenario_report_single_signer_policy() {
        let validator = Validator::new(Policy::new(1, 3).unwrap());
        let report = ScenarioReport::run(&validator, &identities(3));

        // One signer cannot be duplicated, so that case is left out
        assert_eq!(report.scenarios.len(), 4);
        assert!(report.scenarios.iter().all(|s| s.name != "duplicate signers"));
        assert_eq!(report.valid_count(), 1);
        assert!(report.passed());
    }

    #[test]
    fn test_scenario_report_at_least_all_signers() {
        let validator = Validator::new(Policy::new(3, 3).unwrap()).with_exact_count(false);
        let report = ScenarioReport::run(&validator, &identities(3));

        // Four signatures from three wallets must repeat one of them
        let excessive = report
            .scenarios
            .iter()
            .find(|s| s.name == "excessive signatures")
            .unwrap();
        assert_eq!(excessive.result.failure(), Some(&ValidationFailure::DuplicateSigner));
        assert_eq!(report.valid_count(), 1);
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_transfer_pays_recipient_and_returns_change() {
        let (ledger, pipeline, _) = setup();
        let (sender, _) = SeedWallet::generate(Network::Testnet).unwrap();
        let (recipient, _) = SeedWallet::generate(Network::Testnet).unwrap();
        ledger.fund(sender.address(), 20_000_000).await;

        let tx_hash = pipeline
            .transfer(&sender, recipient.address(), 5_000_000)
            .await
            .unwrap();

        assert_eq!(ledger.balance(recipient.address()).await, 5_000_000);
        assert_eq!(ledger.balance(sender.address()).await, 20_000_000 - 5_000_000 - FEE);
        let recipient_utxos = ledger.utxos(recipient.address()).await.unwrap();
        assert_eq!(recipient_utxos[0].out_ref.tx_hash, tx_hash);
        assert_eq!(recipient_utxos[0].out_ref.index, 0);
    }

    #[tokio::test]
    async fn test_transfer_without_enough_funds() {
        let (ledger, pipeline, signers) = setup();
        let (sender, _) = SeedWallet::generate(Network::Testnet).unwrap();
        ledger.fund(sender.address(), 1_000_000).await;

        let err = pipeline
            .transfer(&sender, &signers.identities()[0], 5_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Tx(_)));
        assert!(ledger.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_seed_prefix_signers_spend_end_to_end() {
        let ledger = InMemoryLedger::new();
        let pipeline = MultisigPipeline::new(
            Arc::new(ledger.clone()),
            Validator::default(),
            Network::Testnet,
            FEE,
        )
        .with_derivation(KeyDerivation::SeedPrefix);
        let seeds: Vec<String> = generate_wallets(Network::Testnet, KeyDerivation::SeedPrefix, 5)
            .unwrap()
            .into_iter()
            .map(|w| w.seed_json)
            .collect();
        let signers = pipeline.load_signers(&seeds).unwrap();
        assert!(signers
            .get(1)
            .is_some_and(|w| w.derivation() == KeyDerivation::SeedPrefix));

        let (script, request) = lock(&ledger, &pipeline, &signers).await;
        pipeline.spend(&signers, &script, &request).await.unwrap();

        assert_eq!(ledger.balance(&signers.identities()[1]).await, 32_666_666);
        assert_eq!(ledger.balance(&script.address).await, 0);
    }
}
