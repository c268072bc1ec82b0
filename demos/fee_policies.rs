//! Fee policy and escalation examples

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use reconciliation_core::{EscalationTier, FeeCalculation, FeePolicy, FeeRequest, WaiverRules};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("💸 Reconciliation Core - Fee Policy Examples\n");

    // 1. The default policy shipped with the engine
    let policy = FeePolicy::default();
    policy.validate()?;

    println!("📋 Default policy:");
    println!("  Daily rate:   {}", policy.daily_rate);
    println!("  Grace period: {} days", policy.grace_period_days);
    match &policy.max_fee {
        Some(cap) => println!("  Fee cap:      {}", cap),
        None => println!("  Fee cap:      none"),
    }
    for threshold in policy.tier_thresholds() {
        println!(
            "  From {} billable days: x{}",
            threshold,
            policy.multiplier_for(threshold)
        );
    }
    println!();

    // 2. How the fee grows as settlement slips
    println!("📈 Fee by settlement delay (due 2024-03-01, base 900):");
    let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    for days in [5i64, 10, 40, 75, 120] {
        let settled = due + Duration::days(days);
        let request = FeeRequest::new(due, BigDecimal::from(900)).settled_on(settled);
        let fee = FeeCalculation::calculate(&request, &policy);
        println!(
            "  {:>3} days late: {:>3} billable, x{} escalation, fee {} (capped from {})",
            fee.days_overdue, fee.billable_days, fee.tier_multiplier, fee.final_fee, fee.escalated_fee
        );
    }
    println!();

    // 3. A stricter policy with no cap
    println!("🏗️  Strict uncapped policy (rate 50, grace 3):");
    let strict = FeePolicy::new(BigDecimal::from(50), 3)
        .tier(EscalationTier::new(15, BigDecimal::from(2)))
        .tier(EscalationTier::new(45, BigDecimal::from(3)));
    strict.validate()?;

    for days in [10i64, 30, 60] {
        let settled = due + Duration::days(days);
        let request = FeeRequest::new(due, BigDecimal::from(900)).settled_on(settled);
        let fee = FeeCalculation::calculate(&request, &strict);
        println!(
            "  {:>3} days late: {:>3} billable, x{} escalation, fee {}",
            fee.days_overdue, fee.billable_days, fee.tier_multiplier, fee.final_fee
        );
    }
    println!();

    // 4. Waivers keep the day counts for the audit trail
    println!("🤝 Waiver rules:");
    let rules = WaiverRules::default();
    println!("  Auto-waivable up to: {}", rules.max_auto_waivable);
    println!("  Requires approval:   {}", rules.requires_approval);

    let request = FeeRequest::new(due, BigDecimal::from(900))
        .settled_on(due + Duration::days(60))
        .waived_because("Hardship exemption".to_string());
    let waived = FeeCalculation::calculate(&request, &policy);
    println!(
        "  Waived settlement: {} days overdue recorded, fee {}",
        waived.days_overdue, waived.final_fee
    );

    println!("\n🎉 Fee policy examples completed!");
    Ok(())
}
