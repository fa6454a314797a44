//! End-to-end scenarios through the public engine API.
//!
//! Each test drives `ShieldEngine::execute` and the governance hooks the
//! way a host would, then checks pool totals, positions, rewards and the
//! committed invariants.

use shield_engine::ShieldEngine;
use shield_types::*;

const NATIVE: &str = "uctk";

/// Engine plus a block clock.
struct Harness {
    engine: ShieldEngine,
    ctx: BlockContext,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: ShieldEngine::new(config).expect("valid config"),
            ctx: BlockContext::genesis(),
        }
    }

    fn next_block(&mut self) {
        self.ctx = self.ctx.advance(6);
    }

    fn exec(&mut self, op: Operation) -> Result<OperationOutcome> {
        let result = self.engine.execute(&self.ctx, op);
        self.engine
            .verify_invariants()
            .expect("invariants hold after every operation");
        result
    }

    fn create_pool(&mut self, creator: &str, deposit: Amount, limit: Amount) -> PoolId {
        let outcome = self
            .exec(Operation::CreatePool {
                from: Address::new(creator),
                shield: 1,
                deposit,
                sponsor: "Acme".into(),
                sponsor_addr: "acme-sponsor".into(),
                description: "Acme protocol cover".into(),
                shield_limit: limit,
            })
            .expect("pool creation should succeed");
        outcome.pool_id().expect("pool id")
    }

    fn deposit(&mut self, from: &str, pool_id: PoolId, amount: Amount) -> Result<OperationOutcome> {
        self.exec(Operation::DepositCollateral {
            from: Address::new(from),
            pool_id,
            amount,
        })
    }

    fn withdraw(
        &mut self,
        from: &str,
        pool_id: PoolId,
        amount: Amount,
    ) -> Result<OperationOutcome> {
        self.exec(Operation::WithdrawCollateral {
            from: Address::new(from),
            pool_id,
            amount,
        })
    }

    fn purchase(
        &mut self,
        from: &str,
        pool_id: PoolId,
        shield: Amount,
    ) -> Result<OperationOutcome> {
        self.exec(Operation::PurchaseShield {
            from: Address::new(from),
            pool_id,
            shield,
            description: "hack cover".into(),
        })
    }

    fn purchase_id(outcome: &OperationOutcome) -> PurchaseId {
        match outcome {
            OperationOutcome::ShieldPurchased { purchase_id, .. } => *purchase_id,
            other => panic!("expected ShieldPurchased, got {other:?}"),
        }
    }

    fn withdraw_rewards(&mut self, from: &str) -> Amount {
        match self
            .exec(Operation::WithdrawRewards {
                from: Address::new(from),
            })
            .expect("reward withdrawal should succeed")
        {
            OperationOutcome::RewardsWithdrawn { amount } => amount,
            other => panic!("expected RewardsWithdrawn, got {other:?}"),
        }
    }

    fn approved_claim(
        &mut self,
        proposal: u64,
        purchase_id: PurchaseId,
        beneficiary: &str,
        amount: Amount,
    ) {
        self.engine
            .register_claim(
                &self.ctx,
                ProposalId(proposal),
                purchase_id,
                Address::new(beneficiary),
                amount,
            )
            .expect("claim registration should succeed");
        self.engine
            .approve_claim(&self.ctx, ProposalId(proposal))
            .expect("claim approval should succeed");
    }

    fn pool(&self, pool_id: PoolId) -> Pool {
        self.engine.pool(pool_id).expect("pool exists").clone()
    }
}

#[test]
fn limit_enforced_across_purchases() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("provider", 1000, 1000);

    h.purchase("buyer", pool_id, 600).unwrap();
    let err = h.purchase("buyer", pool_id, 500).unwrap_err();
    assert!(matches!(
        err,
        ShieldError::ShieldLimitExceeded {
            requested: 500,
            issued: 600,
            limit: 1000
        }
    ));

    let pool = h.pool(pool_id);
    assert_eq!(pool.shield_issued, 600);
    assert_eq!(h.engine.purchases_by(&Address::new("buyer")).count(), 1);
}

#[test]
fn purchase_beyond_collateral_rejected() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("provider", 500, 1000);
    let err = h.purchase("buyer", pool_id, 501).unwrap_err();
    assert!(matches!(
        err,
        ShieldError::InsufficientCollateral {
            needed: 501,
            available: 500
        }
    ));
}

#[test]
fn paused_pool_blocks_purchase_but_not_withdrawal() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("provider", 1000, 1000);
    h.purchase("buyer", pool_id, 600).unwrap();

    h.exec(Operation::PausePool {
        from: Address::new("provider"),
        pool_id,
    })
    .unwrap();

    let err = h.purchase("buyer", pool_id, 100).unwrap_err();
    assert_eq!(err, ShieldError::PoolNotActive(pool_id));

    let err = h
        .exec(Operation::StakeForShield {
            from: Address::new("staker"),
            pool_id,
            amount: 10,
        })
        .unwrap_err();
    assert_eq!(err, ShieldError::PoolNotActive(pool_id));

    // 400 unlocked: withdrawable while paused, not a unit more.
    assert!(matches!(
        h.withdraw("provider", pool_id, 401),
        Err(ShieldError::InsufficientUnlockedCollateral { .. })
    ));
    h.withdraw("provider", pool_id, 400).unwrap();

    h.exec(Operation::ResumePool {
        from: Address::new("provider"),
        pool_id,
    })
    .unwrap();
    assert!(h.pool(pool_id).is_active());
}

#[test]
fn pause_requires_creator_or_admin() {
    let mut h = Harness::with_config(EngineConfig {
        admin: Some(Address::new("governance")),
        ..EngineConfig::default()
    });
    let pool_id = h.create_pool("provider", 1000, 1000);

    let err = h
        .exec(Operation::PausePool {
            from: Address::new("stranger"),
            pool_id,
        })
        .unwrap_err();
    assert_eq!(err, ShieldError::Unauthorized(Address::new("stranger")));

    h.exec(Operation::PausePool {
        from: Address::new("governance"),
        pool_id,
    })
    .unwrap();
    let err = h
        .exec(Operation::PausePool {
            from: Address::new("provider"),
            pool_id,
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::InvalidPoolStatus { .. }));
}

#[test]
fn partial_reimbursement_then_already_paid() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("provider", 1000, 1000);
    let purchase_id = Harness::purchase_id(&h.purchase("buyer", pool_id, 600).unwrap());
    h.approved_claim(1, purchase_id, "buyer", 300);

    // Only the beneficiary may withdraw.
    let err = h
        .exec(Operation::WithdrawReimbursement {
            from: Address::new("provider"),
            proposal_id: ProposalId(1),
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::Unauthorized(_)));

    let outcome = h
        .exec(Operation::WithdrawReimbursement {
            from: Address::new("buyer"),
            proposal_id: ProposalId(1),
        })
        .unwrap();
    assert_eq!(
        outcome,
        OperationOutcome::ReimbursementPaid {
            proposal_id: ProposalId(1),
            amount: 300
        }
    );

    let pool = h.pool(pool_id);
    assert_eq!(pool.total_collateral, 700);
    assert_eq!(pool.shield_issued, 300);
    let purchase = h.engine.purchase(purchase_id).unwrap();
    assert_eq!(purchase.coverage, 300);
    assert_eq!(purchase.status, PurchaseStatus::Active);
    assert_eq!(h.engine.claim(ProposalId(1)).unwrap().status, ClaimStatus::Paid);
    let position = h.engine.collateral_position(pool_id, &Address::new("provider"));
    assert_eq!(position.deposited, 700);
    assert_eq!(position.locked, 300);

    let err = h
        .exec(Operation::WithdrawReimbursement {
            from: Address::new("buyer"),
            proposal_id: ProposalId(1),
        })
        .unwrap_err();
    assert_eq!(err, ShieldError::AlreadyPaid(ProposalId(1)));
}

#[test]
fn reimbursement_spreads_loss_pro_rata() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 3000, 4000);
    h.deposit("bob", pool_id, 1000).unwrap();
    let purchase_id = Harness::purchase_id(&h.purchase("buyer", pool_id, 2000).unwrap());
    h.approved_claim(7, purchase_id, "buyer", 2000);

    h.exec(Operation::WithdrawReimbursement {
        from: Address::new("buyer"),
        proposal_id: ProposalId(7),
    })
    .unwrap();

    let alice = h.engine.collateral_position(pool_id, &Address::new("alice"));
    let bob = h.engine.collateral_position(pool_id, &Address::new("bob"));
    assert_eq!((alice.deposited, alice.locked), (1500, 0));
    assert_eq!((bob.deposited, bob.locked), (500, 0));
    assert_eq!(
        h.engine.purchase(purchase_id).unwrap().status,
        PurchaseStatus::Consumed
    );
}

#[test]
fn pending_claim_keeps_purchase_from_expiring() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("provider", 1000, 1000);
    let purchase_id = Harness::purchase_id(&h.purchase("buyer", pool_id, 500).unwrap());
    h.engine
        .register_claim(&h.ctx, ProposalId(3), purchase_id, Address::new("buyer"), 200)
        .unwrap();

    let period = h.engine.config().protection_period_secs.unwrap();
    h.ctx = h.ctx.advance(period + 1);
    assert!(h.engine.process_expirations(&h.ctx).unwrap().is_empty());
    assert_eq!(h.pool(pool_id).shield_issued, 500);

    h.engine.reject_claim(&h.ctx, ProposalId(3)).unwrap();
    assert_eq!(h.engine.process_expirations(&h.ctx).unwrap(), vec![purchase_id]);
    assert_eq!(h.pool(pool_id).shield_issued, 0);
    assert_eq!(
        h.engine.purchase(purchase_id).unwrap().status,
        PurchaseStatus::Expired
    );
    h.engine.verify_invariants().unwrap();
}

#[test]
fn equal_and_unequal_holders_share_premiums() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 10_000);
    h.deposit("bob", pool_id, 1000).unwrap();
    h.exec(Operation::StakeForShield {
        from: Address::new("carol"),
        pool_id,
        amount: 2000,
    })
    .unwrap();

    // Empty pool: 2% of 1000.
    h.purchase("buyer", pool_id, 1000).unwrap();
    assert_eq!(h.engine.pending_rewards(&Address::new("alice"), NATIVE).unwrap(), 5);
    assert_eq!(h.engine.pending_rewards(&Address::new("bob"), NATIVE).unwrap(), 5);
    assert_eq!(h.engine.pending_rewards(&Address::new("carol"), NATIVE).unwrap(), 10);

    assert_eq!(h.withdraw_rewards("alice"), 5);
    assert_eq!(h.withdraw_rewards("alice"), 0);
    assert_eq!(h.withdraw_rewards("carol"), 10);
}

#[test]
fn late_depositor_does_not_earn_earlier_premium() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    h.purchase("buyer", pool_id, 500).unwrap();
    h.next_block();
    h.deposit("bob", pool_id, 1000).unwrap();

    assert_eq!(h.engine.pending_rewards(&Address::new("alice"), NATIVE).unwrap(), 10);
    assert_eq!(h.engine.pending_rewards(&Address::new("bob"), NATIVE).unwrap(), 0);
    // Withdrawing collateral settles, it does not forfeit.
    h.withdraw("alice", pool_id, 500).unwrap();
    assert_eq!(h.withdraw_rewards("alice"), 10);
}

#[test]
fn foreign_service_fees_flow_to_outbox() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    h.exec(Operation::UpdatePool {
        from: Address::new("alice"),
        pool_id,
        shield: None,
        shield_limit: None,
        service_fees: MixedCoins {
            native: 0,
            foreign: vec![Coin::new("uatom", 40)],
        },
        description: None,
    })
    .unwrap();

    let err = h
        .exec(Operation::WithdrawForeignRewards {
            from: Address::new("alice"),
            denom: NATIVE.into(),
            to_addr: "cosmos1dest".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::InvalidDenom(_)));

    let err = h
        .exec(Operation::WithdrawForeignRewards {
            from: Address::new("alice"),
            denom: "uatom".into(),
            to_addr: "not an address".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::InvalidDestinationAddress(_)));

    let outcome = h
        .exec(Operation::WithdrawForeignRewards {
            from: Address::new("alice"),
            denom: "uatom".into(),
            to_addr: "cosmos1dest".into(),
        })
        .unwrap();
    assert_eq!(
        outcome,
        OperationOutcome::ForeignRewardsWithdrawn {
            denom: "uatom".into(),
            to_addr: "cosmos1dest".into(),
            amount: 40
        }
    );
    let outbox = h.engine.foreign_outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].amount, 40);
    assert_eq!(outbox[0].holder, Address::new("alice"));
}

#[test]
fn deposit_withdraw_roundtrip_restores_state() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    let before = h.pool(pool_id);

    h.deposit("bob", pool_id, 250).unwrap();
    h.withdraw("bob", pool_id, 250).unwrap();

    assert_eq!(h.pool(pool_id), before);
    assert!(h
        .engine
        .collateral_position(pool_id, &Address::new("bob"))
        .is_zero());
}

#[test]
fn draining_pool_closes_it() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 100, 100);
    let outcome = h.withdraw("alice", pool_id, 100).unwrap();
    assert_eq!(
        outcome,
        OperationOutcome::CollateralWithdrawn {
            pool_id,
            withdrawn: 100,
            pool_closed: true
        }
    );
    assert!(h.pool(pool_id).is_closed());
    assert_eq!(
        h.deposit("alice", pool_id, 1).unwrap_err(),
        ShieldError::PoolClosed(pool_id)
    );
}

#[test]
fn sponsor_and_limit_updates() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    h.purchase("buyer", pool_id, 800).unwrap();

    let err = h
        .exec(Operation::UpdatePool {
            from: Address::new("alice"),
            pool_id,
            shield: None,
            shield_limit: Some(700),
            service_fees: MixedCoins::default(),
            description: None,
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::ShieldLimitExceeded { .. }));

    let err = h
        .exec(Operation::UpdateSponsor {
            from: Address::new("alice"),
            pool_id,
            sponsor: "Other".into(),
            sponsor_addr: "other-sponsor".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ShieldError::Unauthorized(_)));

    h.exec(Operation::UpdateSponsor {
        from: Address::new("acme-sponsor"),
        pool_id,
        sponsor: "Other".into(),
        sponsor_addr: "other-sponsor".into(),
    })
    .unwrap();
    let pool = h.pool(pool_id);
    assert_eq!(pool.sponsor, "Other");
    assert_eq!(pool.sponsor_addr, Address::new("other-sponsor"));
}

#[test]
fn every_commit_has_a_verifiable_receipt() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    h.purchase("buyer", pool_id, 10).unwrap();
    let _ = h.purchase("buyer", pool_id, 0);

    let receipts: Vec<&Receipt> = h.engine.receipts().iter().collect();
    assert_eq!(receipts.len(), 2);
    assert!(receipts.iter().all(|r| r.verify_hash()));
    assert_eq!(receipts[0].sequence, 1);
    assert_eq!(receipts[1].sequence, 2);
    let outcome: OperationOutcome = serde_json::from_slice(&receipts[1].payload).unwrap();
    assert!(matches!(outcome, OperationOutcome::ShieldPurchased { .. }));
}

#[test]
fn sub_unit_fees_keep_pool_usable() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 3, 3);
    for _ in 0..2 {
        h.exec(Operation::UpdatePool {
            from: Address::new("alice"),
            pool_id,
            shield: None,
            shield_limit: None,
            service_fees: MixedCoins::native(1),
            description: None,
        })
        .expect("fee credit should succeed");
    }
    h.deposit("bob", pool_id, 100)
        .expect("deposit after small fees should succeed");
    h.exec(Operation::StakeForShield {
        from: Address::new("carol"),
        pool_id,
        amount: 1,
    })
    .expect("stake after small fees should succeed");
    h.purchase("buyer", pool_id, 3)
        .expect("purchase after small fees should succeed");

    assert_eq!(h.withdraw_rewards("alice"), 1);
    assert_eq!(h.withdraw_rewards("bob"), 0);
}

#[test]
fn large_foreign_fees_accrue_without_overflow() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1_000_000, 1_000_000);
    let fee: Amount = 200_000_000_000_000_000_000;
    for _ in 0..2 {
        h.exec(Operation::UpdatePool {
            from: Address::new("alice"),
            pool_id,
            shield: None,
            shield_limit: None,
            service_fees: MixedCoins {
                native: 0,
                foreign: vec![Coin::new("uatom", fee)],
            },
            description: None,
        })
        .expect("fee credit should succeed");
    }
    assert_eq!(
        h.engine.pending_rewards(&Address::new("alice"), "uatom").unwrap(),
        2 * fee
    );
    let outcome = h
        .exec(Operation::WithdrawForeignRewards {
            from: Address::new("alice"),
            denom: "uatom".into(),
            to_addr: "cosmos1dest".into(),
        })
        .unwrap();
    assert!(matches!(
        outcome,
        OperationOutcome::ForeignRewardsWithdrawn { amount, .. } if amount == 2 * fee
    ));
}

#[test]
fn stake_capped_by_shield_limit() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 1000, 1000);
    h.purchase("buyer", pool_id, 600).unwrap();

    let err = h
        .exec(Operation::StakeForShield {
            from: Address::new("carol"),
            pool_id,
            amount: 401,
        })
        .unwrap_err();
    assert_eq!(
        err,
        ShieldError::ShieldLimitExceeded {
            requested: 401,
            issued: 600,
            limit: 1000
        }
    );
    assert!(h.engine.stake_position(pool_id, &Address::new("carol")).is_zero());

    h.exec(Operation::StakeForShield {
        from: Address::new("carol"),
        pool_id,
        amount: 400,
    })
    .expect("stake within the limit should succeed");
    assert_eq!(h.pool(pool_id).total_staked, 400);
}

#[test]
fn unstake_allowed_on_paused_and_closed_pools() {
    let mut h = Harness::new();
    let pool_id = h.create_pool("alice", 100, 100);
    h.exec(Operation::StakeForShield {
        from: Address::new("carol"),
        pool_id,
        amount: 50,
    })
    .unwrap();

    h.exec(Operation::PausePool {
        from: Address::new("alice"),
        pool_id,
    })
    .unwrap();
    h.exec(Operation::UnstakeFromShield {
        from: Address::new("carol"),
        pool_id,
        amount: 20,
    })
    .expect("unstake from a paused pool should succeed");

    let outcome = h.withdraw("alice", pool_id, 100).unwrap();
    assert!(matches!(
        outcome,
        OperationOutcome::CollateralWithdrawn {
            pool_closed: true,
            ..
        }
    ));
    h.exec(Operation::UnstakeFromShield {
        from: Address::new("carol"),
        pool_id,
        amount: 30,
    })
    .expect("unstake from a closed pool should succeed");

    assert!(h.pool(pool_id).is_closed());
    assert_eq!(h.pool(pool_id).total_staked, 0);
    assert!(matches!(
        h.exec(Operation::UnstakeFromShield {
            from: Address::new("carol"),
            pool_id,
            amount: 1,
        }),
        Err(ShieldError::InsufficientUnlockedCollateral { .. })
    ));
}

#[test]
fn blank_sponsor_reported_before_address() {
    let mut h = Harness::new();
    let err = h
        .exec(Operation::CreatePool {
            from: Address::new("alice"),
            shield: 1,
            deposit: 10,
            sponsor: "  ".into(),
            sponsor_addr: "not an address".into(),
            description: "cover".into(),
            shield_limit: 10,
        })
        .unwrap_err();
    assert_eq!(err, ShieldError::EmptySponsor);
}
