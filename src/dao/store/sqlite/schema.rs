/// Statements applied in order every time a pool is opened. Each one is idempotent.
pub const STATEMENTS: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            ai_enabled INTEGER NOT NULL DEFAULT 0,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
    ),
    (
        "games",
        "CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            archive_file TEXT NOT NULL,
            image_file TEXT NOT NULL,
            playable_path TEXT,
            avg_quality REAL NOT NULL DEFAULT 0,
            avg_difficulty REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
    ),
    (
        "games_user_idx",
        "CREATE INDEX IF NOT EXISTS games_user_idx ON games(user_id)",
    ),
    (
        "comments",
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            quality INTEGER NOT NULL CHECK (quality BETWEEN 1 AND 5),
            difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
            body TEXT NOT NULL,
            script TEXT,
            play_time_hours REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (user_id, game_id)
        )",
    ),
    (
        "comments_game_idx",
        "CREATE INDEX IF NOT EXISTS comments_game_idx ON comments(game_id)",
    ),
    (
        "game_stats",
        "CREATE TABLE IF NOT EXISTS game_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            play_time_hours REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (user_id, game_id)
        )",
    ),
];
