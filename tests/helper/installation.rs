//! Fixture Nextcloud installation backed by SQLite

use std::path::Path;

use rusqlite::Connection;
use tempfile::TempDir;

pub struct Installation {
    dir: TempDir,
}

impl Installation {
    /// Create `config/config.php` pointing at a SQLite database with an
    /// `oc_appconfig` table and no update check result.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::create_dir_all(&data_dir).unwrap();

        std::fs::write(
            dir.path().join("config/config.php"),
            format!(
                r#"<?php
$CONFIG = array (
  'instanceid' => 'ocfixture',
  'passwordsalt' => 'salt',
  'trusted_domains' =>
  array (
    0 => 'localhost',
  ),
  'datadirectory' => '{}',
  'dbtype' => 'sqlite3',
  'version' => '20.0.3.2',
  'overwrite.cli.url' => 'http://localhost',
  'dbname' => 'nextcloud',
  'dbtableprefix' => 'oc_',
  'installed' => true,
);
"#,
                data_dir.display()
            ),
        )
        .unwrap();

        let conn = Connection::open(data_dir.join("nextcloud.db")).unwrap();
        conn.execute(
            "CREATE TABLE oc_appconfig (appid VARCHAR(32) NOT NULL, configkey VARCHAR(64) NOT NULL, configvalue CLOB, PRIMARY KEY (appid, configkey))",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO oc_appconfig (appid, configkey, configvalue) VALUES ('core', 'installedat', '1607600000.1234')",
            [],
        )
        .unwrap();

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Store the last update check result
    pub fn with_update_result(self, value: &str) -> Self {
        let conn = Connection::open(self.path().join("data/nextcloud.db")).unwrap();
        conn.execute(
            "INSERT INTO oc_appconfig (appid, configkey, configvalue) VALUES ('core', 'lastupdateResult', ?1)",
            [value],
        )
        .unwrap();
        self
    }

    /// Write `version.php` declaring the given components
    pub fn with_installed_version(self, components: &[u32]) -> Self {
        let list = components
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        std::fs::write(
            self.path().join("version.php"),
            format!(
                "<?php\n$OC_Version = array({});\n$OC_VersionString = 'fixture';\n$OC_Channel = 'stable';\n",
                list
            ),
        )
        .unwrap();
        self
    }

    /// Replace `config/config.php`
    pub fn with_config(self, contents: &str) -> Self {
        std::fs::write(self.path().join("config/config.php"), contents).unwrap();
        self
    }
}
