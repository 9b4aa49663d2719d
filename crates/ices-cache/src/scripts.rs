//! Lua scripts executed atomically on the Redis server so a concurrent
//! `LPUSH` can never interleave between the read and the trim.

/// Pop up to `ARGV[1]` of the newest entries (the ones nearest the head,
/// since producers `LPUSH`) and trim the list down to whatever is left.
/// Returns the popped entries, oldest-of-the-popped-batch first.
pub const POP_BATCH: &str = r"
local n = tonumber(ARGV[1])
local items = redis.call('LRANGE', KEYS[1], -n, -1)
redis.call('LTRIM', KEYS[1], 0, -(n + 1))
return items
";
