//! Versioned schema migrations.
//!
//! All schema lives here and is applied once at service startup through
//! [`crate::Store::migrate`]; applied versions are recorded in
//! `schema_migrations` so reruns are no-ops. Request handlers never touch
//! the schema.

pub(crate) struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "warehouse core tables",
        statements: &[
            "CREATE TABLE IF NOT EXISTS Articoli (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                codice TEXT NOT NULL UNIQUE,
                descrizione TEXT,
                barcode TEXT,
                um TEXT,
                peso REAL,
                prezzoUnitario REAL,
                recordCancellato INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS Udc (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                idLocazione INTEGER
            )",
            "CREATE TABLE IF NOT EXISTS UdcProdotti (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                idUdc INTEGER REFERENCES Udc(id),
                idArticolo INTEGER REFERENCES Articoli(id),
                qta REAL NOT NULL DEFAULT 0,
                lotto TEXT,
                matricola TEXT,
                recordCancellato INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS Liste (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                numLista TEXT NOT NULL,
                descrizione TEXT,
                rifLista TEXT,
                idTipoLista INTEGER NOT NULL DEFAULT 1,
                priorita INTEGER NOT NULL DEFAULT 1,
                terminata INTEGER NOT NULL DEFAULT 0,
                recordCancellato INTEGER NOT NULL DEFAULT 0,
                dataCreazione TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS RigheLista (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                idLista INTEGER NOT NULL REFERENCES Liste(id),
                numRigaLista TEXT,
                idProdotto INTEGER NOT NULL REFERENCES Articoli(id),
                codice TEXT,
                descrizione TEXT,
                qtaRichiesta REAL NOT NULL DEFAULT 0,
                qtaMovimentata REAL NOT NULL DEFAULT 0,
                qtaPrenotata REAL NOT NULL DEFAULT 0,
                recordCancellato INTEGER NOT NULL DEFAULT 0,
                dataCreazione TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS ListeAreaDetails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                idLista INTEGER NOT NULL REFERENCES Liste(id),
                idArea INTEGER,
                idMacchina INTEGER
            )",
        ],
    },
    Migration {
        version: 2,
        name: "integration tables",
        statements: &[
            "CREATE TABLE IF NOT EXISTS IntegrationItemMap (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                integrationKey TEXT NOT NULL,
                externalCode TEXT NOT NULL,
                itemId INTEGER,
                itemCode TEXT,
                description TEXT,
                createdAt TEXT NOT NULL,
                UNIQUE (integrationKey, externalCode)
            )",
            "CREATE TABLE IF NOT EXISTS IntegrationTypeMap (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                integrationKey TEXT NOT NULL,
                messageType TEXT NOT NULL,
                idTipoLista INTEGER NOT NULL,
                UNIQUE (integrationKey, messageType)
            )",
            "CREATE TABLE IF NOT EXISTS IntegrationEdiInbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                integrationKey TEXT NOT NULL,
                flow TEXT NOT NULL,
                messageType TEXT,
                rawContent TEXT NOT NULL,
                parsedJson TEXT,
                receivedAt TEXT NOT NULL,
                appliedAt TEXT,
                appliedStatus TEXT,
                appliedMessage TEXT,
                overrideTipoLista INTEGER,
                overrideAreaId INTEGER,
                overrideMachineId INTEGER
            )",
            "CREATE TABLE IF NOT EXISTS IntegrationEdiApplyErrors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                inboxId INTEGER NOT NULL REFERENCES IntegrationEdiInbox(id),
                orderNumber TEXT,
                lineNumber TEXT,
                itemCode TEXT,
                reason TEXT NOT NULL,
                createdAt TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS IntegrationEdiApplyAudit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                inboxId INTEGER NOT NULL REFERENCES IntegrationEdiInbox(id),
                appliedBy TEXT,
                appliedAt TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT
            )",
            "CREATE TABLE IF NOT EXISTS IntegrationSyncLog (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                integrationKey TEXT NOT NULL,
                direction TEXT NOT NULL,
                flow TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT,
                recordCount INTEGER,
                startedAt TEXT NOT NULL,
                finishedAt TEXT,
                durationMs INTEGER
            )",
        ],
    },
    Migration {
        version: 3,
        name: "lookup indexes",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_righe_lista_lista ON RigheLista (idLista)",
            "CREATE INDEX IF NOT EXISTS idx_inbox_key_received
                ON IntegrationEdiInbox (integrationKey, receivedAt)",
            "CREATE INDEX IF NOT EXISTS idx_apply_errors_inbox
                ON IntegrationEdiApplyErrors (inboxId)",
            "CREATE INDEX IF NOT EXISTS idx_sync_log_key_started
                ON IntegrationSyncLog (integrationKey, startedAt)",
        ],
    },
];

pub(crate) const MIGRATIONS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    appliedAt TEXT NOT NULL
)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_strictly_increasing() {
        let mut previous = 0;
        for migration in MIGRATIONS {
            assert!(
                migration.version > previous,
                "migration {} out of order",
                migration.name
            );
            previous = migration.version;
        }
    }

    #[test]
    fn test_statements_are_idempotent_ddl() {
        for migration in MIGRATIONS {
            for statement in migration.statements {
                assert!(
                    statement.trim_start().starts_with("CREATE"),
                    "non-DDL statement in migration {}",
                    migration.version
                );
                assert!(statement.contains("IF NOT EXISTS"));
            }
        }
    }
}
