// tests/ingest_filter.rs
use cryptonews_relay::config::allowlist::DomainAllowList;
use cryptonews_relay::ingest::providers::aggregator::AggregatorProvider;
use cryptonews_relay::ingest::types::Article;
use cryptonews_relay::ingest::{eligibility, filter_eligible, Eligibility};

fn article(link: &str) -> Article {
    let body = serde_json::json!([{ "title": "t", "content": "c", "link": link }]).to_string();
    AggregatorProvider::parse_records(&body).unwrap().remove(0)
}

fn lists() -> (DomainAllowList, DomainAllowList) {
    (
        DomainAllowList::new(["coindesk.com", "decrypt.co"]),
        DomainAllowList::new(["coindesk.com", "WWW.TheBlock.co"]),
    )
}

#[test]
fn sinks_are_gated_independently() {
    let (cms, social) = lists();
    assert_eq!(
        eligibility(&article("https://www.coindesk.com/a"), &cms, &social),
        Eligibility { cms: true, social: true }
    );
    assert_eq!(
        eligibility(&article("https://decrypt.co/b"), &cms, &social),
        Eligibility { cms: true, social: false }
    );
    assert_eq!(
        eligibility(&article("https://theblock.co/c"), &cms, &social),
        Eligibility { cms: false, social: true }
    );
}

#[test]
fn unknown_and_unparseable_sources_are_dropped() {
    let (cms, social) = lists();
    let batch = vec![
        article("https://coindesk.com/keep"),
        article("https://randomblog.io/x"),
        article("not a url at all"),
        article("https://coindesk.com.evil.io/x"),
    ];
    let (kept, filtered) = filter_eligible(batch, &cms, &social);
    assert_eq!(filtered, 3);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].0.url, "https://coindesk.com/keep");
}

#[test]
fn subdomains_do_not_match() {
    let (cms, social) = lists();
    let e = eligibility(&article("https://markets.coindesk.com/x"), &cms, &social);
    assert!(!e.any());
}

#[test]
fn empty_lists_accept_nothing() {
    let empty = DomainAllowList::new(Vec::<String>::new());
    let (kept, filtered) = filter_eligible(vec![article("https://coindesk.com/a")], &empty, &empty);
    assert!(kept.is_empty());
    assert_eq!(filtered, 1);
}
