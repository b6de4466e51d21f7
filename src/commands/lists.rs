use super::{AccessMode, CommandParser, CommandTable};
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("LPUSH", 3, AccessMode::Write, lpush);
    table.register("RPUSH", 3, AccessMode::Write, rpush);
    table.register("LPOP", 2, AccessMode::Write, lpop);
    table.register("RPOP", 2, AccessMode::Write, rpop);
    table.register("LLEN", 2, AccessMode::Read, llen);
    table.register("LINDEX", 3, AccessMode::Read, lindex);
    table.register("LSET", 4, AccessMode::Write, lset);
    table.register("LRANGE", 4, AccessMode::Read, lrange);
    table.register("LREM", 2, AccessMode::Write, lrem);
}

/// Pushes every value onto the head of the list, so `LPUSH k a b c` leaves `c b a`.
fn lpush(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let values = parser.rest_bytes()?;

    let len = store.lists_mut().push_front(&key, values);

    Ok(len.into())
}

fn rpush(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let values = parser.rest_bytes()?;

    let len = store.lists_mut().push_back(&key, values);

    Ok(len.into())
}

fn lpop(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let value = store.lists().and_then(|lists| lists.pop_front(&key));

    Ok(Reply::bytes_or_nil(value))
}

fn rpop(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let value = store.lists().and_then(|lists| lists.pop_back(&key));

    Ok(Reply::bytes_or_nil(value))
}

fn llen(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let len = store.lists().map_or(0, |lists| lists.len(&key));

    Ok(len.into())
}

fn lindex(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let index = parser.next_integer()?;
    parser.finish()?;

    let value = store.lists().and_then(|lists| lists.index(&key, index));

    Ok(Reply::bytes_or_nil(value))
}

/// Replaces the element at `index`. An index past the tail appends instead of failing.
fn lset(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let index = parser.next_integer()?;
    let value = parser.next_bytes()?;
    parser.finish()?;

    store.lists_mut().set(&key, index, value);

    Ok(Reply::ok())
}

/// LRANGE key start stop, with `stop` excluded.
fn lrange(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let start = parser.next_integer()?;
    let stop = parser.next_integer()?;
    parser.finish()?;

    let values = store
        .lists()
        .map(|lists| lists.range(&key, start, stop))
        .unwrap_or_default();

    Ok(Reply::Sequence(values.into_iter().map(Reply::Bytes).collect()))
}

/// Deletes the whole list and replies with the number of elements it held.
fn lrem(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let removed = store.lists().map_or(0, |lists| lists.remove(&key));

    Ok(removed.into())
}
