//! Builds renderable zones out of store rows: forward zones straight from
//! their rows, reverse zones synthesized from records flagged for PTR
//! generation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::config::ReverseSoa;
use crate::db::{Db, record_repo, zone_repo};
use crate::dns::reverse::{self, ReverseError};

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("store read failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("record '{host}' in zone '{zone}': {source}")]
    Ptr {
        zone: String,
        host: String,
        #[source]
        source: ReverseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Forward,
    Reverse,
}

/// SOA values as they appear in the rendered file. `primary_ns` and `rname`
/// are fully qualified with a trailing dot.
#[derive(Debug, Clone, Serialize)]
pub struct Soa {
    pub primary_ns: String,
    pub rname: String,
    pub serial: u64,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
    pub ttl: u32,
}

/// A single line of a rendered zone file. `ttl` is only set when the record
/// deviates from the zone default, so most lines omit the column.
#[derive(Debug, Clone, Serialize)]
pub struct RenderRecord {
    pub rtype: String,
    pub host: String,
    pub content: String,
    pub ttl: Option<u32>,
}

/// One zone ready for rendering. Forward zones carry the SOA of their row;
/// reverse zones carry the operator-configured SOA, since no row owns them.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledZone {
    pub kind: ZoneKind,
    pub name: String,
    pub soa: Soa,
    pub records: Vec<RenderRecord>,
}

impl AssembledZone {
    pub fn file_name(&self) -> String {
        format!("{}.conf", self.name)
    }
}

static LAST_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Allocate a serial that is strictly greater than any previously handed out
/// by this process, anchored to wall-clock seconds. Renders faster than one
/// per second keep incrementing instead of colliding.
fn next_serial(now: u64) -> u64 {
    let mut prev = LAST_SERIAL.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_SERIAL.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}

/// Qualify a name with a trailing dot.
fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

/// Convert a mailbox to the SOA rname form: `admin@example.com` becomes
/// `admin.example.com.`.
fn soa_rname(email: &str) -> String {
    fqdn(&email.replacen('@', ".", 1))
}

/// Pulls zones and records from the store and produces the full renderable
/// zone set, forward and reverse.
pub struct ZoneAssembler {
    db: Db,
    reverse_soa: ReverseSoa,
}

impl ZoneAssembler {
    pub fn new(db: Db, reverse_soa: ReverseSoa) -> Self {
        ZoneAssembler { db, reverse_soa }
    }

    /// Assemble every visible forward zone plus one reverse zone per populated
    /// reverse suffix. A record whose address cannot be classified fails the
    /// whole build; silently dropping its PTR would publish an incomplete
    /// reverse zone.
    pub async fn build_zones(&self) -> Result<Vec<AssembledZone>, AssembleError> {
        let serial = next_serial(Utc::now().timestamp().max(0) as u64);

        let zones = zone_repo::visible(&self.db).await?;
        let mut assembled = Vec::with_capacity(zones.len());
        let mut reverse_zones: BTreeMap<String, Vec<RenderRecord>> = BTreeMap::new();

        for zone in &zones {
            let records = record_repo::visible_for_zone(&self.db, zone.uuid).await?;
            let mut rendered = Vec::with_capacity(records.len());

            for record in &records {
                // zone-file convention: CNAME targets are fully qualified
                let content = if record.rtype == "CNAME" {
                    fqdn(&record.content)
                } else {
                    record.content.clone()
                };

                rendered.push(RenderRecord {
                    rtype: record.rtype.clone(),
                    host: record.host.clone(),
                    content,
                    ttl: (record.ttl != zone.ttl).then_some(record.ttl),
                });

                if record.add_ptr && matches!(record.rtype.as_str(), "A" | "AAAA") {
                    let classify = |source| AssembleError::Ptr {
                        zone: zone.name.clone(),
                        host: record.host.clone(),
                        source,
                    };
                    let suffix =
                        reverse::reverse_zone_of(&record.content, &record.rtype).map_err(classify)?;
                    let ptr_host = reverse::ptr_host(&record.content, &record.rtype)
                        .map_err(|source| AssembleError::Ptr {
                            zone: zone.name.clone(),
                            host: record.host.clone(),
                            source,
                        })?;

                    reverse_zones.entry(suffix).or_default().push(RenderRecord {
                        rtype: "PTR".to_string(),
                        host: ptr_host,
                        content: format!("{}.{}.", record.host, zone.name),
                        ttl: (record.ttl != self.reverse_soa.ttl).then_some(record.ttl),
                    });
                }
            }

            assembled.push(AssembledZone {
                kind: ZoneKind::Forward,
                name: zone.name.clone(),
                soa: Soa {
                    primary_ns: fqdn(&zone.primary_ns),
                    rname: soa_rname(&zone.admin_email),
                    serial,
                    refresh: zone.refresh,
                    retry: zone.retry,
                    expire: zone.expire,
                    minimum: zone.minimum,
                    ttl: zone.ttl,
                },
                records: rendered,
            });
        }

        for (suffix, records) in reverse_zones {
            assembled.push(AssembledZone {
                kind: ZoneKind::Reverse,
                name: suffix,
                soa: Soa {
                    primary_ns: fqdn(&self.reverse_soa.primary_ns),
                    rname: soa_rname(&self.reverse_soa.admin_email),
                    serial,
                    refresh: self.reverse_soa.refresh,
                    retry: self.reverse_soa.retry,
                    expire: self.reverse_soa.expire,
                    minimum: self.reverse_soa.minimum,
                    ttl: self.reverse_soa.ttl,
                },
                records,
            });
        }

        Ok(assembled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::db::record_repo::RecordInput;
    use crate::db::zone_repo::ZoneInput;

    fn zone_input(name: &str) -> ZoneInput {
        ZoneInput {
            name: name.to_string(),
            primary_ns: format!("ns1.{name}"),
            admin_email: format!("admin@{name}"),
            refresh: 1800,
            retry: 1800,
            expire: 604_800,
            minimum: 1800,
            ttl: 3600,
            tags: Vec::new(),
        }
    }

    fn record_input(rtype: &str, host: &str, content: &str, add_ptr: bool) -> RecordInput {
        RecordInput {
            rtype: rtype.to_string(),
            host: host.to_string(),
            content: content.to_string(),
            ttl: 3600,
            add_ptr,
            tags: Vec::new(),
        }
    }

    fn assembler(db: &Db) -> ZoneAssembler {
        ZoneAssembler::new(db.clone(), ReverseSoa::default())
    }

    #[tokio::test]
    async fn empty_store_assembles_to_nothing() {
        let db = test_db().await;
        let zones = assembler(&db).build_zones().await.unwrap();
        assert!(zones.is_empty());
    }

    #[tokio::test]
    async fn ptr_records_are_grouped_into_reverse_zones() {
        let db = test_db().await;
        let zone = zone_repo::insert(&db, &zone_input("home")).await.unwrap();
        record_repo::insert(&db, zone, &record_input("A", "example", "10.1.2.3", true))
            .await
            .unwrap();
        record_repo::insert(&db, zone, &record_input("A", "printer", "192.168.1.9", true))
            .await
            .unwrap();
        record_repo::insert(&db, zone, &record_input("AAAA", "example", "fd00::1", true))
            .await
            .unwrap();

        let zones = assembler(&db).build_zones().await.unwrap();
        let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "home",
                "10.in-addr.arpa",
                "168.192.in-addr.arpa",
                "d.f.ip6.arpa"
            ]
        );

        let ten = zones.iter().find(|z| z.name == "10.in-addr.arpa").unwrap();
        assert_eq!(ten.kind, ZoneKind::Reverse);
        assert_eq!(ten.records.len(), 1);
        assert_eq!(ten.records[0].rtype, "PTR");
        assert_eq!(ten.records[0].host, "3.2.1.10.in-addr.arpa.");
        assert_eq!(ten.records[0].content, "example.home.");
    }

    #[tokio::test]
    async fn unclassifiable_address_fails_the_whole_build() {
        let db = test_db().await;
        let zone = zone_repo::insert(&db, &zone_input("home")).await.unwrap();
        record_repo::insert(&db, zone, &record_input("A", "ok", "10.0.0.1", true))
            .await
            .unwrap();
        record_repo::insert(&db, zone, &record_input("A", "bad", "8.8.8.8", true))
            .await
            .unwrap();

        let err = assembler(&db).build_zones().await.unwrap_err();
        match err {
            AssembleError::Ptr { zone, host, source } => {
                assert_eq!(zone, "home");
                assert_eq!(host, "bad");
                assert!(matches!(source, ReverseError::UnsupportedAddressSpace(ref a) if a == "8.8.8.8"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cname_content_is_fully_qualified() {
        let db = test_db().await;
        let zone = zone_repo::insert(&db, &zone_input("home")).await.unwrap();
        record_repo::insert(
            &db,
            zone,
            &record_input("CNAME", "www", "example.home", false),
        )
        .await
        .unwrap();
        record_repo::insert(&db, zone, &record_input("TXT", "txt", "\"v=spf1\"", false))
            .await
            .unwrap();

        let zones = assembler(&db).build_zones().await.unwrap();
        let home = &zones[0];
        let cname = home.records.iter().find(|r| r.rtype == "CNAME").unwrap();
        assert_eq!(cname.content, "example.home.");
        let txt = home.records.iter().find(|r| r.rtype == "TXT").unwrap();
        assert_eq!(txt.content, "\"v=spf1\"");
    }

    #[tokio::test]
    async fn rebuild_differs_only_in_serial() {
        let db = test_db().await;
        let zone = zone_repo::insert(&db, &zone_input("home")).await.unwrap();
        record_repo::insert(&db, zone, &record_input("A", "example", "10.1.2.3", true))
            .await
            .unwrap();

        let asm = assembler(&db);
        let first = asm.build_zones().await.unwrap();
        let second = asm.build_zones().await.unwrap();

        assert!(second[0].soa.serial > first[0].soa.serial);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.records.len(), b.records.len());
            for (ra, rb) in a.records.iter().zip(&b.records) {
                assert_eq!(ra.host, rb.host);
                assert_eq!(ra.rtype, rb.rtype);
                assert_eq!(ra.content, rb.content);
            }
        }
    }

    #[test]
    fn serials_are_strictly_increasing_even_within_one_second() {
        let now = Utc::now().timestamp() as u64;
        let a = next_serial(now);
        let b = next_serial(now);
        let c = next_serial(now);
        assert!(a < b && b < c);
    }

    #[test]
    fn rname_replaces_only_the_mailbox_separator() {
        assert_eq!(soa_rname("admin@example.com"), "admin.example.com.");
        assert_eq!(soa_rname("already.dotted."), "already.dotted.");
    }
}
