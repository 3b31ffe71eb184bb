pub const SCHEMA: &str = r#"
-- posts table: deduplicated channel messages that matched the keyword filter
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    source_channel TEXT,
    message_id INTEGER NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_processed ON posts(processed);
"#;
