//! Idempotent DDL, re-run on every worker startup. A failure here is logged
//! and not fatal — the store degrades to "retry next startup" rather than
//! crash-looping a worker that would otherwise function against an
//! already-provisioned database. Each statement executes independently
//! (sqlx's extended query protocol rejects multi-statement strings).

pub const CORE_SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS email_events (
        id              BIGSERIAL PRIMARY KEY,
        message_id      TEXT NOT NULL,
        user_id         TEXT NOT NULL,
        tenant_id       TEXT NOT NULL,
        tenant_alias    TEXT DEFAULT '',
        sender          TEXT DEFAULT '',
        recipients      JSONB DEFAULT '[]',
        subject         TEXT DEFAULT '',
        received_at     TIMESTAMPTZ,
        created_at      TIMESTAMPTZ DEFAULT NOW()
    )",
    r"CREATE TABLE IF NOT EXISTS analysis_results (
        id              BIGSERIAL PRIMARY KEY,
        email_event_id  BIGINT REFERENCES email_events(id),
        message_id      TEXT NOT NULL,
        tenant_id       TEXT NOT NULL,
        analyzer        TEXT NOT NULL,
        observations    JSONB DEFAULT '[]',
        processing_time_ms DOUBLE PRECISION DEFAULT 0.0,
        created_at      TIMESTAMPTZ DEFAULT NOW()
    )",
    r"CREATE TABLE IF NOT EXISTS policy_outcomes (
        id              BIGSERIAL PRIMARY KEY,
        message_id      TEXT NOT NULL,
        tenant_id       TEXT NOT NULL,
        policy_name     TEXT DEFAULT '',
        action_taken    TEXT DEFAULT 'none',
        matched_observations JSONB DEFAULT '{}',
        created_at      TIMESTAMPTZ DEFAULT NOW()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_events_message_unique ON email_events(message_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_outcomes_message_policy_unique ON policy_outcomes(message_id, policy_name)",
    "CREATE INDEX IF NOT EXISTS idx_results_tenant_analyzer ON analysis_results(tenant_id, analyzer)",
    "CREATE INDEX IF NOT EXISTS idx_results_message ON analysis_results(message_id)",
    "CREATE INDEX IF NOT EXISTS idx_outcomes_tenant ON policy_outcomes(tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_tenant ON email_events(tenant_id)",
];

/// Owned by the BEC subsystem; created lazily on first use rather than
/// eagerly at worker startup, since a deployment that disables `bec_detector`
/// never needs these tables.
pub const BEC_SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS sender_profiles (
        id                  BIGSERIAL PRIMARY KEY,
        tenant_id           TEXT NOT NULL,
        sender_domain       TEXT NOT NULL,
        email_count         BIGINT DEFAULT 0,
        first_seen_at       TIMESTAMPTZ NOT NULL,
        last_seen_at        TIMESTAMPTZ NOT NULL,
        known_display_names JSONB DEFAULT '[]',
        typical_categories  JSONB DEFAULT '{}',
        typical_send_hours  JSONB DEFAULT '{}',
        reply_to_domains    JSONB DEFAULT '[]'
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_sender_profiles_unique ON sender_profiles(tenant_id, sender_domain)",
    r"CREATE TABLE IF NOT EXISTS sender_recipient_pairs (
        id                  BIGSERIAL PRIMARY KEY,
        tenant_id           TEXT NOT NULL,
        sender_address      TEXT NOT NULL,
        recipient_address   TEXT NOT NULL,
        sender_domain       TEXT NOT NULL,
        message_count       BIGINT DEFAULT 0,
        first_contact_at    TIMESTAMPTZ NOT NULL,
        last_contact_at     TIMESTAMPTZ NOT NULL,
        category_distribution JSONB DEFAULT '{}'
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_sender_recipient_pairs_unique ON sender_recipient_pairs(tenant_id, sender_address, recipient_address)",
    "CREATE INDEX IF NOT EXISTS idx_sender_recipient_pairs_domain ON sender_recipient_pairs(tenant_id, sender_domain, recipient_address)",
];
