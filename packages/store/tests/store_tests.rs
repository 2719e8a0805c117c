mod common;

use std::error::Error;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use store::{Hashes, Kv, Lists};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    count: u32,
}

#[tokio::test]
async fn kv_put_get_delete() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    let value = Payload {
        name: "alpha".into(),
        count: 3,
    };
    Kv::put("test:kv", &value, None).await?;

    let got: Option<Payload> = Kv::get("test:kv").await?;
    assert_eq!(got, Some(value.clone()));

    // put replaces in place
    let replaced = Payload {
        name: "beta".into(),
        count: 4,
    };
    Kv::put("test:kv", &replaced, None).await?;
    let got: Option<Payload> = Kv::get("test:kv").await?;
    assert_eq!(got, Some(replaced));

    Kv::delete("test:kv").await?;
    let got: Option<Payload> = Kv::get("test:kv").await?;
    assert_eq!(got, None);

    Ok(())
}

#[tokio::test]
async fn kv_expired_values_read_as_absent() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    Kv::put("test:expiring", &"soon", Some(Duration::from_millis(20))).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let got: Option<String> = Kv::get("test:expiring").await?;
    assert_eq!(got, None);
    Ok(())
}

#[tokio::test]
async fn put_nx_is_exclusive_until_expiry() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    let won = Kv::put_nx("test:nx", &"first", Some(Duration::from_secs(30))).await?;
    assert!(won);

    let second = Kv::put_nx("test:nx", &"second", Some(Duration::from_secs(30))).await?;
    assert!(!second);

    let held: Option<String> = Kv::get("test:nx").await?;
    assert_eq!(held.as_deref(), Some("first"));

    Ok(())
}

#[tokio::test]
async fn put_nx_sweeps_an_expired_holder() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    assert!(Kv::put_nx("test:nx2", &"stale", Some(Duration::from_millis(20))).await?);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let won = Kv::put_nx("test:nx2", &"fresh", Some(Duration::from_secs(30))).await?;
    assert!(won);
    let held: Option<String> = Kv::get("test:nx2").await?;
    assert_eq!(held.as_deref(), Some("fresh"));

    Ok(())
}

#[tokio::test]
async fn delete_if_eq_requires_matching_value() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    Kv::put("test:cad", &"token-a", None).await?;

    assert!(!Kv::delete_if_eq("test:cad", &"token-b").await?);
    let still: Option<String> = Kv::get("test:cad").await?;
    assert_eq!(still.as_deref(), Some("token-a"));

    assert!(Kv::delete_if_eq("test:cad", &"token-a").await?);
    let gone: Option<String> = Kv::get("test:cad").await?;
    assert_eq!(gone, None);

    // deleting an absent key is a clean false
    assert!(!Kv::delete_if_eq("test:cad", &"token-a").await?);

    Ok(())
}

#[tokio::test]
async fn incr_counts_from_zero() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    assert_eq!(Kv::incr("test:counter", 1).await?, 1);
    assert_eq!(Kv::incr("test:counter", 1).await?, 2);
    assert_eq!(Kv::incr("test:counter", 5).await?, 7);

    Ok(())
}

#[tokio::test]
async fn lists_read_write_whole_value() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    let empty: Vec<Payload> = Lists::read("test:list").await?;
    assert!(empty.is_empty());
    assert_eq!(Lists::len("test:list").await?, 0);

    let items = vec![
        Payload {
            name: "one".into(),
            count: 1,
        },
        Payload {
            name: "two".into(),
            count: 2,
        },
    ];
    Lists::write("test:list", &items).await?;
    assert_eq!(Lists::len("test:list").await?, 2);

    let back: Vec<Payload> = Lists::read("test:list").await?;
    assert_eq!(back, items);

    Lists::write("test:list", &items[..1]).await?;
    assert_eq!(Lists::len("test:list").await?, 1);

    Lists::clear("test:list").await?;
    assert_eq!(Lists::len("test:list").await?, 0);

    Ok(())
}

#[tokio::test]
async fn hashes_index_fields_independently() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_store().await?;

    Hashes::put("test:hash", "w1", &Payload { name: "a".into(), count: 1 }).await?;
    Hashes::put("test:hash", "w2", &Payload { name: "b".into(), count: 2 }).await?;
    Hashes::put("test:other", "w1", &Payload { name: "c".into(), count: 3 }).await?;

    let one: Option<Payload> = Hashes::get("test:hash", "w1").await?;
    assert_eq!(one.map(|p| p.name), Some("a".to_string()));

    let all = Hashes::all::<Payload>("test:hash").await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("w2").map(|p| p.count), Some(2));

    // field update supersedes in place
    Hashes::put("test:hash", "w1", &Payload { name: "a2".into(), count: 9 }).await?;
    let updated: Option<Payload> = Hashes::get("test:hash", "w1").await?;
    assert_eq!(updated.map(|p| p.count), Some(9));

    Hashes::delete("test:hash", "w1").await?;
    let gone: Option<Payload> = Hashes::get("test:hash", "w1").await?;
    assert_eq!(gone, None);

    Hashes::clear("test:hash").await?;
    assert!(Hashes::all::<Payload>("test:hash").await?.is_empty());

    // the other hash is untouched
    let other = Hashes::all::<Payload>("test:other").await?;
    assert_eq!(other.len(), 1);

    Ok(())
}
