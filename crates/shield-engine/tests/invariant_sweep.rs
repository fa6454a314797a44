//! Randomized operation sequences against the committed invariants.
//!
//! Operations are drawn from a seeded RNG so failures reproduce. Many of
//! them are rejected; a rejection must be a business rule (never an
//! internal `SH_ERR_9xx` failure) and leave the state exactly as it was.
//! Every commit must leave pool totals, locks, coverage and supply
//! consistent, and pool totals must match a tally kept from outcomes.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shield_engine::ShieldEngine;
use shield_types::*;

const ACTORS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

fn actor(rng: &mut StdRng) -> Address {
    Address::new(ACTORS[rng.gen_range(0..ACTORS.len())])
}

fn random_operation(rng: &mut StdRng, pools: u64) -> Operation {
    let from = actor(rng);
    let pool_id = PoolId(rng.gen_range(1..=pools.max(1)));
    let amount: Amount = rng.gen_range(0..2_000);
    match rng.gen_range(0..10) {
        0 => Operation::CreatePool {
            from,
            shield: rng.gen_range(0..500),
            deposit: amount,
            sponsor: "Sponsor".into(),
            sponsor_addr: "sponsor1addr".into(),
            description: "pool".into(),
            shield_limit: rng.gen_range(0..5_000),
        },
        1 | 2 => Operation::DepositCollateral {
            from,
            pool_id,
            amount,
        },
        3 => Operation::WithdrawCollateral {
            from,
            pool_id,
            amount: amount / 2,
        },
        4 | 5 => Operation::PurchaseShield {
            from,
            pool_id,
            shield: amount,
            description: "cover".into(),
        },
        6 => Operation::StakeForShield {
            from,
            pool_id,
            amount: amount / 4,
        },
        7 => Operation::UnstakeFromShield {
            from,
            pool_id,
            amount: amount / 4,
        },
        8 => Operation::UpdatePool {
            from,
            pool_id,
            shield: None,
            shield_limit: None,
            service_fees: MixedCoins {
                native: amount / 10,
                foreign: vec![Coin::new("uatom", amount / 20)],
            },
            description: None,
        },
        _ => {
            if rng.gen_bool(0.5) {
                Operation::WithdrawRewards { from }
            } else {
                Operation::WithdrawForeignRewards {
                    from,
                    denom: "uatom".into(),
                    to_addr: "cosmos1dest".into(),
                }
            }
        }
    }
}

/// Pool totals and reward flows tracked from outcomes alone, without
/// reading engine internals.
#[derive(Default)]
struct Tally {
    collateral: BTreeMap<PoolId, Amount>,
    staked: BTreeMap<PoolId, Amount>,
    native_income: Amount,
    native_paid: Amount,
}

impl Tally {
    fn record(&mut self, engine: &ShieldEngine, op: &Operation, outcome: &OperationOutcome) {
        match (op, outcome) {
            (Operation::CreatePool { deposit, .. }, OperationOutcome::PoolCreated { pool_id }) => {
                *self.collateral.entry(*pool_id).or_default() += deposit;
            }
            (_, OperationOutcome::CollateralDeposited { pool_id, deposited }) => {
                *self.collateral.entry(*pool_id).or_default() += deposited;
            }
            (_, OperationOutcome::CollateralWithdrawn { pool_id, withdrawn, .. }) => {
                *self.collateral.entry(*pool_id).or_default() -= withdrawn;
            }
            (_, OperationOutcome::Staked { pool_id, staked }) => {
                *self.staked.entry(*pool_id).or_default() += staked;
            }
            (_, OperationOutcome::Unstaked { pool_id, unstaked }) => {
                *self.staked.entry(*pool_id).or_default() -= unstaked;
            }
            (_, OperationOutcome::ShieldPurchased { premium, .. }) => {
                self.native_income += premium;
            }
            (Operation::UpdatePool { service_fees, .. }, OperationOutcome::PoolUpdated { .. }) => {
                self.native_income += service_fees.native;
            }
            (_, OperationOutcome::RewardsWithdrawn { amount }) => {
                self.native_paid += amount;
            }
            (_, OperationOutcome::ReimbursementPaid { proposal_id, amount }) => {
                let claim = engine.claim(*proposal_id).expect("paid claim exists");
                let purchase = engine.purchase(claim.purchase_id).expect("purchase exists");
                *self.collateral.entry(purchase.pool_id).or_default() -= amount;
            }
            _ => {}
        }
    }

    fn check(&self, engine: &ShieldEngine, context: &str) {
        for pool in engine.pools() {
            let collateral = self.collateral.get(&pool.id).copied().unwrap_or(0);
            let staked = self.staked.get(&pool.id).copied().unwrap_or(0);
            assert_eq!(pool.total_collateral, collateral, "{context}: {} collateral", pool.id);
            assert_eq!(pool.total_staked, staked, "{context}: {} stake", pool.id);
        }
        assert!(
            self.native_paid <= self.native_income,
            "{context}: paid {} of {} native income",
            self.native_paid,
            self.native_income
        );
    }
}

/// Apply `op`, requiring any rejection to be a business rule rather than
/// an internal failure, and that only commits advance the receipt log.
fn apply(
    engine: &mut ShieldEngine,
    tally: &mut Tally,
    ctx: &BlockContext,
    op: Operation,
    context: &str,
) -> Option<OperationOutcome> {
    let before = engine.receipts().next_sequence();
    match engine.execute(ctx, op.clone()) {
        Ok(outcome) => {
            assert_eq!(engine.receipts().next_sequence(), before + 1, "{context}");
            tally.record(engine, &op, &outcome);
            Some(outcome)
        }
        Err(e) => {
            assert!(e.code() < 900, "{context}: {:?} failed internally: {e}", op.kind());
            assert_eq!(engine.receipts().next_sequence(), before, "{context}");
            None
        }
    }
}

fn run_sweep(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = ShieldEngine::new(EngineConfig::default()).expect("valid config");
    let mut tally = Tally::default();
    let mut ctx = BlockContext::genesis();
    let mut next_proposal = 1u64;
    let mut committed = 0usize;

    for step in 0..steps {
        let context = format!("seed {seed} step {step}");
        if step % 7 == 0 {
            ctx = ctx.advance(rng.gen_range(1..200_000));
            engine
                .process_expirations(&ctx)
                .expect("expiry sweep should succeed");
        }

        let pools = engine.pools().count() as u64;
        let op = random_operation(&mut rng, pools);
        if apply(&mut engine, &mut tally, &ctx, op, &context).is_some() {
            committed += 1;
        }

        // Occasionally run a claim through governance and pay it out.
        if step % 11 == 5 {
            let candidate = ACTORS.iter().find_map(|name| {
                let purchaser = Address::new(*name);
                let active = engine
                    .purchases_by(&purchaser)
                    .find(|p| p.is_active())
                    .map(|p| (p.id, p.purchaser.clone(), p.coverage));
                active
            });
            if let Some((purchase_id, beneficiary, coverage)) = candidate {
                let proposal = ProposalId(next_proposal);
                next_proposal += 1;
                let amount = rng.gen_range(1..=coverage);
                engine
                    .register_claim(&ctx, proposal, purchase_id, beneficiary.clone(), amount)
                    .expect("claim within coverage registers");
                if rng.gen_bool(0.8) {
                    engine
                        .approve_claim(&ctx, proposal)
                        .expect("claim approval should succeed");
                    let paid = apply(
                        &mut engine,
                        &mut tally,
                        &ctx,
                        Operation::WithdrawReimbursement {
                            from: beneficiary,
                            proposal_id: proposal,
                        },
                        &context,
                    );
                    assert!(paid.is_some(), "{context}: approved claim pays out");
                } else {
                    engine
                        .reject_claim(&ctx, proposal)
                        .expect("claim rejection should succeed");
                }
            }
        }

        engine
            .verify_invariants()
            .unwrap_or_else(|e| panic!("{context}: {e}"));
        tally.check(&engine, &context);
    }

    assert!(committed > 0, "seed {seed} never committed an operation");
}

#[test]
fn sweep_seed_1() {
    run_sweep(1, 400);
}

#[test]
fn sweep_seed_42() {
    run_sweep(42, 400);
}

#[test]
fn sweep_seed_2024() {
    run_sweep(2024, 400);
}

#[test]
fn rewards_never_exceed_what_was_paid_in() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut engine = ShieldEngine::new(EngineConfig::default()).expect("valid config");
    let ctx = BlockContext::genesis();
    engine
        .execute(
            &ctx,
            Operation::CreatePool {
                from: Address::new("alice"),
                shield: 1,
                deposit: 10_000,
                sponsor: "Sponsor".into(),
                sponsor_addr: "sponsor1addr".into(),
                description: "pool".into(),
                shield_limit: 1_000_000,
            },
        )
        .expect("pool creation should succeed");

    let mut fees_in: Amount = 0;
    for _ in 0..200 {
        let from = actor(&mut rng);
        let amount: Amount = rng.gen_range(1..500);
        if rng.gen_bool(0.5) {
            engine
                .execute(
                    &ctx,
                    Operation::DepositCollateral {
                        from,
                        pool_id: PoolId(1),
                        amount,
                    },
                )
                .expect("deposit should succeed");
        } else {
            let fee = amount / 3;
            fees_in += fee;
            engine
                .execute(
                    &ctx,
                    Operation::UpdatePool {
                        from: Address::new("alice"),
                        pool_id: PoolId(1),
                        shield: None,
                        shield_limit: None,
                        service_fees: MixedCoins::native(fee),
                        description: None,
                    },
                )
                .expect("fee credit should succeed");
        }
    }

    let mut paid_out: Amount = 0;
    for name in ACTORS {
        let outcome = engine
            .execute(&ctx, Operation::WithdrawRewards { from: Address::new(name) })
            .expect("reward withdrawal should succeed");
        if let OperationOutcome::RewardsWithdrawn { amount } = outcome {
            paid_out += amount;
        }
    }
    assert!(paid_out <= fees_in);
    // Floor rounding loses at most one unit per holder per credit.
    assert!(fees_in - paid_out <= 200 * ACTORS.len() as Amount);
    engine.verify_invariants().expect("invariants hold");
}
