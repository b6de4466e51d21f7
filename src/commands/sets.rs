use super::{AccessMode, CommandParser, CommandTable};
use crate::reply::Reply;
use crate::store::{Sets, Store};
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("SADD", 3, AccessMode::Write, sadd);
    table.register("SCARD", 2, AccessMode::Read, scard);
    table.register("SDIFF", 3, AccessMode::Read, sdiff);
    table.register("SINTER", 3, AccessMode::Read, sinter);
    table.register("SUNION", 3, AccessMode::Read, sunion);
    table.register("SDIFFSCORE", 3, AccessMode::Read, sdiffscore);
    table.register("SINTERSCORE", 3, AccessMode::Read, sinterscore);
    table.register("SUNIONSCORE", 3, AccessMode::Read, sunionscore);
    table.register("SISMEMBER", 3, AccessMode::Read, sismember);
    table.register("SMEMBERS", 2, AccessMode::Read, smembers);
    table.register("SREM", 3, AccessMode::Write, srem);
}

fn sadd(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let members = parser.rest_strings()?;

    let added = store.sets_mut().add(&key, members);

    Ok(added.into())
}

fn scard(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let card = store.sets().map_or(0, |sets| sets.card(&key));

    Ok(card.into())
}

type Algebra = fn(&Sets, &str, &str) -> Vec<String>;

/// Runs a set operation between exactly two keys.
fn combine(
    store: &Store,
    parser: &mut CommandParser,
    op: Algebra,
) -> Result<Vec<String>, Error> {
    let first = parser.next_string()?;
    let second = parser.next_string()?;
    parser.finish()?;

    Ok(store
        .sets()
        .map(|sets| op(sets, &first, &second))
        .unwrap_or_default())
}

fn sdiff(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::diff).map(Reply::texts)
}

fn sinter(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::inter).map(Reply::texts)
}

fn sunion(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::union).map(Reply::texts)
}

/// Like SDIFF but only replies with the size of the result.
fn sdiffscore(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::diff).map(|members| members.len().into())
}

fn sinterscore(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::inter).map(|members| members.len().into())
}

fn sunionscore(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    combine(store, parser, Sets::union).map(|members| members.len().into())
}

fn sismember(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let member = parser.next_string()?;
    parser.finish()?;

    let found = store.sets().is_some_and(|sets| sets.is_member(&key, &member));

    Ok(found.into())
}

fn smembers(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let members = store
        .sets()
        .map(|sets| sets.members(&key))
        .unwrap_or_default();

    Ok(Reply::texts(members))
}

fn srem(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let members = parser.rest_strings()?;

    let removed = store.sets().map_or(0, |sets| sets.remove(&key, &members));

    Ok(removed.into())
}
