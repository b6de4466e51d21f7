use super::{AccessMode, CommandParser, CommandTable};
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("HSET", 4, AccessMode::Write, hset);
    table.register("HGET", 3, AccessMode::Read, hget);
    table.register("HDEL", 3, AccessMode::Write, hdel);
    table.register("HEXISTS", 3, AccessMode::Read, hexists);
    table.register("HGETALL", 2, AccessMode::Read, hgetall);
    table.register("HKEYS", 2, AccessMode::Read, hkeys);
    table.register("HVALS", 2, AccessMode::Read, hvals);
    table.register("HLEN", 2, AccessMode::Read, hlen);
    table.register("HMGET", 3, AccessMode::Read, hmget);
    table.register("HMSET", 3, AccessMode::Write, hmset);
}

/// Sets one field. Replies 1 when the field is new, 0 when it was overwritten.
///
/// Ref: <https://redis.io/docs/latest/commands/hset>
fn hset(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let field = parser.next_string()?;
    let value = parser.next_bytes()?;
    parser.finish()?;

    let created = store.hashes_mut().set(&key, field, value);

    Ok(Reply::Integer(created as i64))
}

fn hget(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let field = parser.next_string()?;
    parser.finish()?;

    let value = store.hashes().and_then(|hashes| hashes.get(&key, &field));

    Ok(Reply::bytes_or_nil(value))
}

fn hdel(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let fields = parser.rest_strings()?;

    let removed = store
        .hashes()
        .map_or(0, |hashes| hashes.remove(&key, &fields));

    Ok(removed.into())
}

fn hexists(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let field = parser.next_string()?;
    parser.finish()?;

    let found = store
        .hashes()
        .is_some_and(|hashes| hashes.exists(&key, &field));

    Ok(found.into())
}

/// Every field followed by its value, flattened into a single array.
///
/// Ref: <https://redis.io/docs/latest/commands/hgetall>
fn hgetall(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let entries = store
        .hashes()
        .map(|hashes| hashes.get_all(&key))
        .unwrap_or_default();

    Ok(Reply::Pairs(
        entries
            .into_iter()
            .map(|(field, value)| (Reply::Text(field), Reply::Bytes(value)))
            .collect(),
    ))
}

fn hkeys(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let fields = store
        .hashes()
        .map(|hashes| hashes.keys(&key))
        .unwrap_or_default();

    Ok(Reply::texts(fields))
}

fn hvals(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let values = store
        .hashes()
        .map(|hashes| hashes.values(&key))
        .unwrap_or_default();

    Ok(Reply::Sequence(values.into_iter().map(Reply::Bytes).collect()))
}

fn hlen(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let len = store.hashes().map_or(0, |hashes| hashes.len(&key));

    Ok(len.into())
}

fn hmget(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let fields = parser.rest_strings()?;

    let values = match store.hashes() {
        Some(hashes) => hashes.get_many(&key, &fields),
        None => vec![None; fields.len()],
    };

    Ok(Reply::Sequence(
        values.into_iter().map(Reply::bytes_or_nil).collect(),
    ))
}

fn hmset(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let pairs = parser.rest_pairs()?;

    store.hashes_mut().set_many(&key, pairs);

    Ok(Reply::ok())
}
