use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_core::Issuer;
use tally_ingest::{Ingestor, PlainTextExtractor, Provenance, StatementFile};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn ingestor() -> Ingestor {
    Ingestor::new(Box::new(PlainTextExtractor)).with_today(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
}

const AMAZON_SYNCHRONY: &str = r#"
Amazon Store Card
Synchrony Bank
Account Number ending in 4821
Billing Cycle from 12/15/2022 to 01/14/2023
Transaction Detail
Date  Reference #  Description  Amount
12/28 P9281ABC0EHK7LHHD AMAZON.COM SEATTLE WA $23.45
01/03 P9281ABC0EHK7XYZQ AMAZON MARKETPLACE RETURN ($12.99)
01/05 P9281ABC0EHK7QQQQ AMZN Mktp US* $0.00
Page 1 of 2
"#;

const CHASE_CREDIT: &str = r#"
Chase Freedom Unlimited
ACCOUNT ACTIVITY
Date of Transaction    Merchant Name or Transaction Description    $ Amount
PAYMENTS AND OTHER CREDITS
01/10     Payment Thank You-Mobile               -500.00
PURCHASE
01/05     STARBUCKS STORE 0123                   5.25
Total fees charged in 2023 $0.00
"#;

const WELLS_FARGO: &str = "\
Wells Fargo Everyday Checking
Statement period 7/1/2022 to 7/31/2022
Transaction history
Date     Description                             Deposits/Additions   Withdrawals/Subtractions   Ending daily balance
7/1      Online Transfer From Savings                        500.00
7/5      Purchase authorized on 07/03 Safeway #1234                                   54.20             1,020.15
";

#[tokio::test]
async fn test_amazon_card_across_year_boundary() {
    let res = ingestor()
        .ingest(&StatementFile::new("amazon-jan.txt", AMAZON_SYNCHRONY.as_bytes().to_vec()))
        .await;

    assert_eq!(res.issuer, Issuer::AmazonSynchrony);
    assert_eq!(res.provenance, Provenance::Local);
    assert_eq!(res.transactions.len(), 2, "phantom fragment is garbage");
    assert_eq!(res.telemetry.lines_segmented, 3);
    assert_eq!(res.telemetry.lines_skipped, 1);

    let purchase = &res.transactions[0];
    assert_eq!(purchase.date, NaiveDate::from_ymd_opt(2022, 12, 28));
    assert_eq!(purchase.credit, dec("23.45"));
    assert_eq!(purchase.account_id.as_deref(), Some("4821"));
    assert_eq!(purchase.source_issuer.as_deref(), Some("amazon-synchrony"));
    assert_eq!(purchase.statement_period.end, NaiveDate::from_ymd_opt(2023, 1, 14));

    let refund = &res.transactions[1];
    assert_eq!(refund.date, NaiveDate::from_ymd_opt(2023, 1, 3));
    assert_eq!(refund.debit, dec("12.99"));
}

#[tokio::test]
async fn test_chase_credit_by_filename_template() {
    let res = ingestor()
        .ingest(&StatementFile::new(
            "/downloads/20230115-statements-1234-.pdf",
            CHASE_CREDIT.as_bytes().to_vec(),
        ))
        .await;

    assert_eq!(res.issuer, Issuer::ChaseCredit);
    let amounts: Vec<(Decimal, Decimal)> = res.transactions.iter().map(|t| (t.debit, t.credit)).collect();
    assert_eq!(amounts, vec![(dec("500.00"), Decimal::ZERO), (dec("5.25"), Decimal::ZERO)]);
    assert!(res.transactions.iter().all(|t| t.date.unwrap().to_string().starts_with("2023-01-")));
}

#[tokio::test]
async fn test_wells_fargo_two_column_layout() {
    let res = ingestor()
        .ingest(&StatementFile::new("wf.txt", WELLS_FARGO.as_bytes().to_vec()))
        .await;

    assert_eq!(res.issuer, Issuer::WellsFargo);
    assert_eq!(res.transactions.len(), 2);
    assert_eq!(res.transactions[0].credit, dec("500.00"));
    assert_eq!(res.transactions[1].debit, dec("54.20"));
    assert_eq!(res.transactions[1].balance, Some(dec("1020.15")));
    assert_eq!(res.transactions[1].date, NaiveDate::from_ymd_opt(2022, 7, 5));
}

#[tokio::test]
async fn test_batch_continues_past_empty_file() {
    let ing = ingestor();
    let empty = StatementFile::new("blank.txt", Vec::new());
    let good = StatementFile::new("wf.txt", WELLS_FARGO.as_bytes().to_vec());
    let (a, b) = tokio::join!(ing.ingest(&empty), ing.ingest(&good));

    assert_eq!(a.provenance, Provenance::None);
    assert!(!a.warnings.is_empty());
    assert_eq!(b.provenance, Provenance::Local);
}

#[tokio::test]
async fn test_every_emitted_record_holds_the_invariants() {
    let ing = ingestor();
    for (name, text) in [
        ("a.txt", AMAZON_SYNCHRONY),
        ("20230115-statements-1234-.pdf", CHASE_CREDIT),
        ("wf.txt", WELLS_FARGO),
    ] {
        let res = ing.ingest(&StatementFile::new(name, text.as_bytes().to_vec())).await;
        for t in &res.transactions {
            assert!(t.is_consistent(), "{name}: {t:?}");
            let json = serde_json::to_value(t).unwrap();
            let date = json["date"].as_str().unwrap();
            assert_eq!(date.len(), 10, "{name}: {date}");
        }
    }
}
