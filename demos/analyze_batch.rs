//! End-to-end batch reconciliation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::utils::MemoryBackend;
use reconciliation_core::{
    Contract, DescriptionParser, FeePolicy, PaymentRecord, ReconciliationEngine,
    ReconciliationStorage, StatisticsAggregator,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("🔗 Reconciliation Core - Batch Analysis Example\n");

    // 1. Seed an in-memory backend with contracts and unreconciled payments
    let tenant_id = Uuid::new_v4();
    let backend = MemoryBackend::new();

    let acme = Contract::new(
        tenant_id,
        "4521".to_string(),
        "Acme Holdings".to_string(),
        BigDecimal::from(900),
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
    )
    .agreement_number("55123456".to_string());
    let amal = Contract::new(
        tenant_id,
        "88".to_string(),
        "شركة الأمل التجارية".to_string(),
        BigDecimal::from(1200),
        NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
    );

    println!("🏢 Active contracts:");
    for contract in [&acme, &amal] {
        println!(
            "  ✓ {} - {} ({}/month)",
            contract.contract_number, contract.customer_name, contract.monthly_amount
        );
    }
    backend.seed_contract(acme);
    backend.seed_contract(amal);
    backend.set_policy(tenant_id, FeePolicy::default());

    let payments = vec![
        PaymentRecord::new(
            tenant_id,
            "Rent payment contract #4521 for March 2024, ref REF9981".to_string(),
            BigDecimal::from(900),
        )
        .payment_number("PAY-1001".to_string())
        .due_on(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        .paid_on(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()),
        PaymentRecord::new(
            tenant_id,
            "دفعة إيجار عقد 88 شهر مارس 2024".to_string(),
            BigDecimal::from(1200),
        )
        .payment_number("PAY-1002".to_string())
        .due_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .paid_on(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()),
        PaymentRecord::new(
            tenant_id,
            "Utilities transfer for the warehouse".to_string(),
            BigDecimal::from(150),
        )
        .payment_number("PAY-1003".to_string()),
    ];

    println!("\n💳 Incoming payments:");
    for payment in &payments {
        println!(
            "  ✓ {}: \"{}\" ({})",
            payment.payment_number.as_deref().unwrap_or("?"),
            payment.description,
            payment.amount
        );
        backend.seed_payment(payment.clone());
    }

    // 2. Analyze the whole batch straight from storage
    let engine = ReconciliationEngine::for_tenant(tenant_id).with_parser(
        DescriptionParser::with_customer_names(vec![
            "Acme Holdings".to_string(),
            "شركة الأمل التجارية".to_string(),
        ]),
    );
    let results = engine.analyze_from_storage(&backend).await?;

    println!("\n🔍 Analysis results:");
    for row in &results {
        println!(
            "  {} parsed with {}% confidence",
            row.payment_number.as_deref().unwrap_or("?"),
            row.parsed.confidence
        );
        match &row.best_match {
            Some(best) => println!(
                "      best candidate: contract {} scored {} ({})",
                best.contract_number, best.total_score, best.action
            ),
            None => println!("      no candidate contracts"),
        }
        if let Some(fee) = &row.fee {
            println!(
                "      {} days overdue, {} billable, late fee {}",
                fee.days_overdue, fee.billable_days, fee.final_fee
            );
        }
    }

    // 3. Summarize the batch before anything is written
    let policy = FeePolicy::default();
    let stats = StatisticsAggregator::new(&policy).summarize(&results);
    println!("\n📊 Batch statistics:");
    println!("  Rows analyzed:   {}", stats.total_rows);
    println!("  Auto-link ready: {}", stats.auto_link_rows);
    println!("  Rows with fees:  {}", stats.rows_with_fees);
    println!("  Total fees:      {}", stats.total_fee_amount);
    for bucket in &stats.billable_day_histogram {
        println!("  {:<15} {} row(s)", bucket.label, bucket.rows);
    }

    // 4. Apply the reviewed rows through the settlement writer
    let mut writer = backend.clone();
    let report = engine.apply_selected(results, &mut writer).await;

    println!("\n💰 Apply report:");
    println!("  Processed:  {}", report.processed);
    println!("  Successful: {}", report.successful);
    println!("  Skipped:    {}", report.skipped);
    println!("  Failed:     {}", report.failed);
    println!(
        "  Fees billed: {} totalling {}",
        report.fees_applied, report.total_fee_amount
    );

    println!("\n🧾 Invoices created:");
    for invoice in backend.invoices() {
        println!("  ✓ {} ({})", invoice.description, invoice.amount);
        for line in &invoice.line_items {
            println!("      {}: {}", line.description, line.amount);
        }
    }

    // 5. Waive a disputed late fee with an approver on record
    println!("\n🤝 Waiving a disputed fee:");
    let contracts = backend.load_contracts(tenant_id).await?;
    let disputed = PaymentRecord::new(
        tenant_id,
        "Late fee for rent contract 4521, 29 days overdue".to_string(),
        BigDecimal::from(900),
    )
    .payment_number("PAY-1004".to_string())
    .due_on(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
    .paid_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

    let mut disputed_row = engine.analyze_row(&disputed, &contracts, &policy);
    if let Some(fee) = &disputed_row.fee {
        println!("  Fee before waiver: {}", fee.final_fee);
    }
    engine
        .waive_and_record(
            &mut disputed_row,
            &policy,
            "Maintenance outage credit",
            Some("ops-lead"),
            &mut writer,
        )
        .await?;
    println!("  Row status now: {}", disputed_row.status);
    for audit in backend.waivers() {
        println!(
            "  ✓ Waived {} for payment {} (approved by {})",
            audit.amount_waived,
            audit.payment_id,
            audit.approver_id.as_deref().unwrap_or("-")
        );
    }

    // 6. Assess the wider portfolio for overdue risk
    let portfolio = vec![
        Contract::new(
            tenant_id,
            "7401".to_string(),
            "Blue Orchid Cafe".to_string(),
            BigDecimal::from(1500),
            NaiveDate::from_ymd_opt(2022, 9, 1).unwrap(),
        )
        .next_due_on(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
        .balance_due(BigDecimal::from(4500)),
        Contract::new(
            tenant_id,
            "9912".to_string(),
            "Harbor Fitness".to_string(),
            BigDecimal::from(2000),
            NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
        )
        .next_due_on(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
        .balance_due(BigDecimal::from(2000)),
    ];

    let as_of = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
    let assessments = engine.assess_overdue(&portfolio, &policy, as_of)?;

    println!("\n⚠️  Overdue portfolio as of {}:", as_of);
    for entry in &assessments {
        println!(
            "  {} - {}: {} days overdue, {} risk, accrued fee {}",
            entry.contract_number,
            entry.customer_name,
            entry.days_overdue,
            entry.risk,
            entry.fee.final_fee
        );
    }

    println!("\n🎉 Batch reconciliation completed!");
    Ok(())
}
