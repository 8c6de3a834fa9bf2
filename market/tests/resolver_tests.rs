use std::path::Path;

use chrono::NaiveDate;
use market::{
    Instrument, LocalDirProvider, ReferencePriceResolver, Unavailable, time::MICROS_PER_SECOND,
};

/// 2024-08-12T00:00:00Z
const DAY_START_S: i64 = 1_723_420_800;

fn aug(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, day).unwrap()
}

fn us(secs: i64) -> i64 {
    secs * MICROS_PER_SECOND
}

/// Utility: write a Tardis-style day file for `instrument`.
fn write_day(
    dir: &Path,
    provider: &LocalDirProvider,
    inst: &Instrument,
    date: NaiveDate,
    rows: &[(i64, f64, f64)],
) {
    let mut body = String::from(
        "exchange,symbol,timestamp,local_timestamp,asks[0].price,asks[0].amount,bids[0].price,bids[0].amount\n",
    );
    for (ts_s, bid, ask) in rows {
        body.push_str(&format!(
            "binance,{},{},{},{},1.0,{},1.0\n",
            inst.symbol(),
            us(*ts_s),
            us(*ts_s) + 500,
            ask,
            bid
        ));
    }
    std::fs::write(dir.join(provider.file_name(inst, date)), body).unwrap();
}

#[test]
fn resolves_mid_from_local_day_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");

    write_day(
        dir.path(),
        &provider,
        &eth,
        aug(12),
        &[
            (DAY_START_S + 10, 1999.0, 2001.0),
            (DAY_START_S + 20, 2004.0, 2006.0),
        ],
    );

    let resolver = ReferencePriceResolver::new(provider);

    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 15)), Ok(2000.0));
    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 20)), Ok(2005.0));
    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 3600)), Ok(2005.0));

    let snap = resolver
        .resolve_snapshot(&eth, us(DAY_START_S + 19))
        .unwrap();
    assert_eq!(snap.ts_us, us(DAY_START_S + 10));
}

#[test]
fn corrupt_table_only_affects_its_instrument() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");
    let btc = Instrument::new("BTC", "USDC");

    write_day(dir.path(), &provider, &eth, aug(12), &[(DAY_START_S, 1999.0, 2001.0)]);
    std::fs::write(
        dir.path().join(provider.file_name(&btc, aug(12))),
        "timestamp,best_bid,best_ask\nnot-a-time,1,2\n",
    )
    .unwrap();

    let resolver = ReferencePriceResolver::new(provider);
    let t = us(DAY_START_S + 60);

    assert_eq!(resolver.resolve(&btc, t), Err(Unavailable::SeriesUnreadable));
    assert_eq!(resolver.resolve(&eth, t), Ok(2000.0));
    // still unreadable on the second query, served from cache
    assert_eq!(resolver.resolve(&btc, t), Err(Unavailable::SeriesUnreadable));
}

#[test]
fn query_before_first_snapshot_is_unavailable_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");

    write_day(dir.path(), &provider, &eth, aug(12), &[(DAY_START_S + 100, 1999.0, 2001.0)]);

    let resolver = ReferencePriceResolver::new(provider);

    assert_eq!(
        resolver.resolve(&eth, us(DAY_START_S + 99)),
        Err(Unavailable::NoSnapshotBefore)
    );
}

#[test]
fn previous_day_file_covers_early_morning_queries() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");

    write_day(dir.path(), &provider, &eth, aug(11), &[(DAY_START_S - 1, 1989.0, 1991.0)]);
    write_day(dir.path(), &provider, &eth, aug(12), &[(DAY_START_S + 30, 1999.0, 2001.0)]);

    let resolver = ReferencePriceResolver::new(provider);

    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 5)), Ok(1990.0));
    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 30)), Ok(2000.0));
}

#[test]
fn unreadable_query_day_does_not_fall_back_to_stale_data() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");

    write_day(dir.path(), &provider, &eth, aug(11), &[(DAY_START_S - 1, 999.0, 1001.0)]);
    std::fs::write(
        dir.path().join(provider.file_name(&eth, aug(12))),
        "timestamp,best_bid,best_ask\ngarbage,1,2\n",
    )
    .unwrap();

    let resolver = ReferencePriceResolver::new(provider);

    assert_eq!(
        resolver.resolve(&eth, us(DAY_START_S + 20 * 3600)),
        Err(Unavailable::SeriesUnreadable)
    );
    // the day before is still readable on its own
    assert_eq!(resolver.resolve(&eth, us(DAY_START_S - 1)), Ok(1000.0));
}

#[test]
fn missing_day_files_are_skipped_on_the_way_back() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalDirProvider::new(dir.path());
    let eth = Instrument::new("ETH", "USDC");

    let two_days_before = DAY_START_S - 2 * 86_400;
    write_day(
        dir.path(),
        &provider,
        &eth,
        aug(10),
        &[(two_days_before + 10, 1999.0, 2001.0)],
    );

    let resolver = ReferencePriceResolver::new(provider);

    assert_eq!(resolver.resolve(&eth, us(DAY_START_S - 86_400)), Ok(2000.0));
    assert_eq!(resolver.resolve(&eth, us(DAY_START_S + 10)), Ok(2000.0));
}
