use std::path::PathBuf;

/// SOA values applied to synthesized reverse zones, which have no owning row.
#[derive(Clone, Debug)]
pub struct ReverseSoa {
    pub primary_ns: String,  // "ns1.example.net."
    pub admin_email: String, // "hostmaster@example.net"
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
    pub ttl: u32,
}

impl Default for ReverseSoa {
    fn default() -> Self {
        ReverseSoa {
            primary_ns: "ns1.localhost.".into(),
            admin_email: "hostmaster@localhost".into(),
            refresh: 1800,
            retry: 1800,
            expire: 604_800,
            minimum: 1800,
            ttl: 3600,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Directory the rendered zone files and index are written to. Doubles as
    /// the git working copy when publishing is enabled.
    pub output_dir: PathBuf,
    /// Directory holding the tera templates (`zone.conf.tera`,
    /// `named.conf.zones.tera`).
    pub template_dir: PathBuf,
    pub reverse_soa: ReverseSoa,
}

impl AppConfig {
    /// Glob handed to tera when loading the template directory.
    pub fn template_glob(&self) -> String {
        format!("{}/*.tera", self.template_dir.display())
    }
}
