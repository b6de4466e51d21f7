use bytes::Bytes;
use itertools::Itertools;

use super::{parse_float, AccessMode, CommandParser, CommandParserError, CommandTable};
use crate::frame::Frame;
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("ZADD", 4, AccessMode::Write, zadd);
    table.register("ZCARD", 2, AccessMode::Read, zcard);
    table.register("ZCOUNT", 4, AccessMode::Read, zcount);
    table.register("ZINCRBY", 4, AccessMode::Write, zincrby);
    table.register("ZRANGE", 4, AccessMode::Read, zrange);
    table.register("ZRANGEBYSCORE", 4, AccessMode::Read, zrangebyscore);
    table.register("ZRANK", 3, AccessMode::Read, zrank);
    table.register("ZREM", 3, AccessMode::Write, zrem);
}

/// ZADD key score member [score member ...]
///
/// Replies with the number of members that were not in the sorted set before. Existing members
/// are rescored. Nothing is written unless every score parses.
///
/// Ref: <https://redis.io/docs/latest/commands/zadd>
fn zadd(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let args = parser.rest_strings()?;

    if args.len() % 2 != 0 {
        return Err(CommandParserError::UnbalancedPairs.into());
    }

    let entries = args
        .into_iter()
        .tuples()
        .map(|(score, member)| parse_float(&score).map(|score| (score, member)))
        .collect::<Result<Vec<_>, CommandParserError>>()?;

    let added = store.sorted_sets_mut().add(&key, entries);

    Ok(added.into())
}

fn zcard(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let card = store.sorted_sets().map_or(0, |zsets| zsets.card(&key));

    Ok(card.into())
}

/// ZCOUNT key min max, both bounds inclusive. `-inf` and `+inf` are accepted.
fn zcount(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let min = parser.next_float()?;
    let max = parser.next_float()?;
    parser.finish()?;

    let count = store
        .sorted_sets()
        .map_or(0, |zsets| zsets.count(&key, min, max));

    Ok(count.into())
}

/// ZINCRBY key increment member
fn zincrby(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let delta = parser.next_float()?;
    let member = parser.next_string()?;
    parser.finish()?;

    let score = store.sorted_sets_mut().incr_by(&key, delta, &member)?;

    Ok(Reply::Float(score))
}

/// Reads the optional trailing `WITHSCORES` flag.
fn with_scores(parser: &mut CommandParser) -> Result<bool, Error> {
    if parser.remaining() == 0 {
        return Ok(false);
    }

    let flag = parser.next_string()?;
    if !flag.eq_ignore_ascii_case("WITHSCORES") {
        return Err(CommandParserError::UnexpectedArgument {
            actual: Frame::Bulk(Bytes::from(flag)),
        }
        .into());
    }

    parser.finish()?;
    Ok(true)
}

fn scored(entries: Vec<(String, f64)>, with_scores: bool) -> Reply {
    if with_scores {
        Reply::Pairs(
            entries
                .into_iter()
                .map(|(member, score)| (Reply::Text(member), Reply::Float(score)))
                .collect(),
        )
    } else {
        Reply::texts(entries.into_iter().map(|(member, _)| member))
    }
}

/// ZRANGE key start stop [WITHSCORES]
///
/// Both ranks are inclusive and 0-based. Negative ranks count back from the highest score.
fn zrange(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let start = parser.next_integer()?;
    let stop = parser.next_integer()?;
    let with_scores = with_scores(parser)?;

    let entries = store
        .sorted_sets()
        .map(|zsets| zsets.range(&key, start, stop))
        .unwrap_or_default();

    Ok(scored(entries, with_scores))
}

/// ZRANGEBYSCORE key min max [WITHSCORES]
fn zrangebyscore(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let min = parser.next_float()?;
    let max = parser.next_float()?;
    let with_scores = with_scores(parser)?;

    let entries = store
        .sorted_sets()
        .map(|zsets| zsets.range_by_score(&key, min, max))
        .unwrap_or_default();

    Ok(scored(entries, with_scores))
}

/// 1-based rank of the member, nil when either the key or the member is missing.
fn zrank(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let member = parser.next_string()?;
    parser.finish()?;

    let rank = store
        .sorted_sets()
        .and_then(|zsets| zsets.rank(&key, &member));

    Ok(rank.map_or(Reply::Nil, Reply::from))
}

fn zrem(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let members = parser.rest_strings()?;

    let removed = store
        .sorted_sets()
        .map_or(0, |zsets| zsets.remove(&key, &members));

    Ok(removed.into())
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::run;
    use crate::reply::Reply;
    use crate::store::Store;

    fn fixture() -> Store {
        let store = Store::new();
        run(&store, &["ZADD", "z", "1", "x"]);
        run(&store, &["ZADD", "z", "5", "y"]);
        run(&store, &["ZADD", "z", "3", "w"]);
        store
    }

    #[test]
    fn ranking() {
        let store = fixture();

        assert_eq!(
            run(&store, &["ZRANGE", "z", "0", "-1"]),
            Reply::texts(["x", "w", "y"])
        );
        assert_eq!(run(&store, &["ZRANK", "z", "y"]), Reply::Integer(3));
        assert_eq!(run(&store, &["ZRANK", "z", "x"]), Reply::Integer(1));
        assert_eq!(run(&store, &["ZCARD", "z"]), Reply::Integer(3));
    }

    #[test]
    fn zadd_counts_new_members_only() {
        let store = Store::new();

        assert_eq!(
            run(&store, &["ZADD", "z", "1", "a", "2", "b"]),
            Reply::Integer(2)
        );
        assert_eq!(
            run(&store, &["ZADD", "z", "10", "a", "3", "c"]),
            Reply::Integer(1)
        );
        assert_eq!(
            run(&store, &["ZRANGE", "z", "0", "-1"]),
            Reply::texts(["b", "c", "a"])
        );
    }

    #[test]
    fn zadd_rejects_bad_input() {
        let store = Store::new();

        assert_eq!(
            run(&store, &["ZADD", "z", "1", "a", "nan", "b"]),
            Reply::Error("ERR value is not a valid float".to_string())
        );
        assert!(matches!(
            run(&store, &["ZADD", "z", "1", "a", "2"]),
            Reply::Error(_)
        ));
        assert_eq!(run(&store, &["ZCARD", "z"]), Reply::Integer(0));
    }

    #[test]
    fn zrange_with_scores() {
        let store = fixture();

        assert_eq!(
            run(&store, &["ZRANGE", "z", "0", "1", "withscores"]),
            Reply::Pairs(vec![
                (Reply::Text("x".to_string()), Reply::Float(1.0)),
                (Reply::Text("w".to_string()), Reply::Float(3.0)),
            ])
        );
        assert!(matches!(
            run(&store, &["ZRANGE", "z", "0", "1", "LIMIT"]),
            Reply::Error(_)
        ));
    }

    #[test]
    fn zrangebyscore_and_zcount() {
        let store = fixture();

        assert_eq!(
            run(&store, &["ZRANGEBYSCORE", "z", "2", "+inf"]),
            Reply::texts(["w", "y"])
        );
        assert_eq!(run(&store, &["ZCOUNT", "z", "-inf", "3"]), Reply::Integer(2));
        assert_eq!(run(&store, &["ZCOUNT", "z", "4", "2"]), Reply::Integer(0));
    }

    #[test]
    fn zincrby_replies_with_float() {
        let store = fixture();

        assert_eq!(
            run(&store, &["ZINCRBY", "z", "2.5", "x"]),
            Reply::Float(3.5)
        );
        assert_eq!(
            run(&store, &["ZINCRBY", "z", "1", "fresh"]),
            Reply::Float(1.0)
        );
        assert_eq!(
            run(&store, &["ZRANGE", "z", "0", "-1"]),
            Reply::texts(["fresh", "w", "x", "y"])
        );
    }

    #[test]
    fn missing_sorted_set_reads_as_empty() {
        let store = Store::new();

        assert_eq!(run(&store, &["ZCARD", "z"]), Reply::Integer(0));
        assert_eq!(run(&store, &["ZRANK", "z", "x"]), Reply::Nil);
        assert_eq!(run(&store, &["ZRANGE", "z", "0", "-1"]), Reply::Sequence(vec![]));
        assert_eq!(run(&store, &["ZREM", "z", "x"]), Reply::Integer(0));
    }

    #[test]
    fn zrem_updates_ranks() {
        let store = fixture();

        assert_eq!(run(&store, &["ZREM", "z", "x", "nope"]), Reply::Integer(1));
        assert_eq!(run(&store, &["ZRANK", "z", "y"]), Reply::Integer(2));
        assert_eq!(run(&store, &["ZRANK", "z", "x"]), Reply::Nil);
    }
}
