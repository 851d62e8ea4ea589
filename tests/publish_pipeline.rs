//! End-to-end publish flow against a file-backed store: CRUD in, staged
//! preview, publish out to disk, deploy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bindforge::config::ReverseSoa;
use bindforge::db::{self, record_repo, zone_repo};
use bindforge::deploy::{DeployStatus, Deployer, DeploymentGate};
use bindforge::dns::assemble::ZoneAssembler;
use bindforge::dns::render::{INDEX_FILE_NAME, ZoneFileRenderer};
use bindforge::publish::Publisher;
use bindforge::staging::StagingCoordinator;
use bindforge::vcs::VersionControl;

struct CountingVcs {
    pushes: AtomicUsize,
}

#[async_trait]
impl VersionControl for CountingVcs {
    async fn push(&self) -> anyhow::Result<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn is_dirty(&self) -> anyhow::Result<bool> {
        Ok(false)
    }
}

struct CountingDeployer {
    runs: AtomicUsize,
}

#[async_trait]
impl Deployer for CountingDeployer {
    async fn run(&self) -> anyhow::Result<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok("PLAY RECAP".to_string())
    }
}

fn template_glob() -> String {
    format!("{}/templates/*.tera", env!("CARGO_MANIFEST_DIR"))
}

#[tokio::test]
async fn staged_zone_travels_from_store_to_disk_to_deployed() {
    let dir = tempfile::tempdir().unwrap();
    let db = db::init_db(&dir.path().join("bindforge.sqlite3"))
        .await
        .unwrap();
    let out = dir.path().join("output");

    let zone = zone_repo::insert(
        &db,
        &zone_repo::ZoneInput {
            name: "home".to_string(),
            primary_ns: "ns1.home".to_string(),
            admin_email: "admin@home".to_string(),
            refresh: 1800,
            retry: 1800,
            expire: 604_800,
            minimum: 1800,
            ttl: 3600,
            tags: vec!["internal".to_string()],
        },
    )
    .await
    .unwrap();
    record_repo::insert(
        &db,
        zone,
        &record_repo::RecordInput {
            rtype: "A".to_string(),
            host: "example".to_string(),
            content: "10.1.2.3".to_string(),
            ttl: 3600,
            add_ptr: true,
            tags: Vec::new(),
        },
    )
    .await
    .unwrap();

    let gate = DeploymentGate::new(db.clone());
    gate.mark_staging().await.unwrap();

    let vcs = Arc::new(CountingVcs {
        pushes: AtomicUsize::new(0),
    });
    let deployer = Arc::new(CountingDeployer {
        runs: AtomicUsize::new(0),
    });
    let publisher = Publisher::new(
        ZoneAssembler::new(db.clone(), ReverseSoa::default()),
        ZoneFileRenderer::new(&template_glob(), &out).unwrap(),
        StagingCoordinator::new(db.clone()),
        gate.clone(),
        vcs.clone(),
        deployer.clone(),
    );

    // preview first: pure, in-memory, nothing written
    let preview = publisher.preview().await.unwrap();
    assert!(preview.files["home.conf"].contains("example IN A 10.1.2.3"));
    assert!(
        preview.files["10.in-addr.arpa.conf"]
            .contains("3.2.1.10.in-addr.arpa. IN PTR example.home.")
    );
    assert!(preview.index.contains("zone \"home\""));
    assert!(!out.exists());

    // publish: files on disk, rows committed, push counted, gate advanced
    let committed = publisher.publish().await.unwrap();
    assert_eq!(committed, 2);
    assert_eq!(vcs.pushes.load(Ordering::SeqCst), 1);
    assert!(out.join("home.conf").exists());
    assert!(out.join("10.in-addr.arpa.conf").exists());
    assert!(out.join(INDEX_FILE_NAME).exists());

    let staging = StagingCoordinator::new(db.clone());
    let (zones, records) = staging.get_staged().await.unwrap();
    assert!(zones.is_empty());
    assert!(records.is_empty());
    assert_eq!(gate.status().await.unwrap(), DeployStatus::AwaitingDeployment);

    // deploy: collaborator runs once, gate reaches its final state
    let output = publisher.deploy().await.unwrap();
    assert!(output.contains("PLAY RECAP"));
    assert_eq!(deployer.runs.load(Ordering::SeqCst), 1);
    assert_eq!(gate.status().await.unwrap(), DeployStatus::Deployed);

    // publishing again with nothing staged is a harmless no-op
    assert_eq!(publisher.publish().await.unwrap(), 0);
    assert_eq!(gate.status().await.unwrap(), DeployStatus::Deployed);
}

#[tokio::test]
async fn re_rendering_a_fixed_snapshot_differs_only_in_serial() {
    let dir = tempfile::tempdir().unwrap();
    let db = db::init_db(&dir.path().join("bindforge.sqlite3"))
        .await
        .unwrap();

    let zone = zone_repo::insert(
        &db,
        &zone_repo::ZoneInput {
            name: "lab".to_string(),
            primary_ns: "ns1.lab".to_string(),
            admin_email: "admin@lab".to_string(),
            refresh: 1800,
            retry: 1800,
            expire: 604_800,
            minimum: 1800,
            ttl: 3600,
            tags: Vec::new(),
        },
    )
    .await
    .unwrap();
    for (host, addr) in [("a", "10.0.0.1"), ("b", "10.0.0.2"), ("c", "10.0.0.3")] {
        record_repo::insert(
            &db,
            zone,
            &record_repo::RecordInput {
                rtype: "A".to_string(),
                host: host.to_string(),
                content: addr.to_string(),
                ttl: 3600,
                add_ptr: true,
                tags: Vec::new(),
            },
        )
        .await
        .unwrap();
    }

    let assembler = ZoneAssembler::new(db.clone(), ReverseSoa::default());
    let renderer = ZoneFileRenderer::new(&template_glob(), dir.path().join("out")).unwrap();

    let first = renderer.render(&assembler.build_zones().await.unwrap()).unwrap();
    let second = renderer.render(&assembler.build_zones().await.unwrap()).unwrap();

    assert_eq!(
        first.files.keys().collect::<Vec<_>>(),
        second.files.keys().collect::<Vec<_>>()
    );
    for (name, text) in &first.files {
        let strip_serial = |s: &str| -> String {
            s.lines()
                .filter(|l| !l.contains("; serial"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(
            strip_serial(text),
            strip_serial(&second.files[name]),
            "zone file {name} changed between renders"
        );
    }
}
