use super::{AccessMode, CommandParser, CommandTable};
use crate::reply::Reply;
use crate::store::{Store, StoreError};
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("SET", 3, AccessMode::Write, set);
    table.register("GET", 2, AccessMode::Read, get);
    table.register("DEL", 2, AccessMode::Write, del);
    table.register("EXISTS", 2, AccessMode::Read, exists);
    table.register("INCR", 2, AccessMode::Write, incr);
    table.register("INCRBY", 3, AccessMode::Write, incr_by);
    table.register("DECR", 2, AccessMode::Write, decr);
    table.register("DECRBY", 3, AccessMode::Write, decr_by);
    table.register("APPEND", 3, AccessMode::Write, append);
    table.register("MSET", 3, AccessMode::Write, mset);
    table.register("MGET", 2, AccessMode::Read, mget);
}

/// SET key value
pub(crate) fn set(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let value = parser.next_bytes()?;
    parser.finish()?;

    store.strings_mut().set(key, value);

    Ok(Reply::ok())
}

/// GET key
pub(crate) fn get(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let value = store.strings().and_then(|strings| strings.get(&key));

    Ok(Reply::bytes_or_nil(value))
}

/// DEL key [key ...]
pub(crate) fn del(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let keys = parser.rest_strings()?;

    let removed = store.strings().map_or(0, |strings| strings.remove(&keys));

    Ok(removed.into())
}

/// EXISTS key
pub(crate) fn exists(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    let found = store.strings().is_some_and(|strings| strings.exists(&key));

    Ok(found.into())
}

fn add(store: &Store, key: &str, delta: i64) -> Result<Reply, Error> {
    let value = store.strings_mut().incr_by(key, delta)?;
    Ok(value.into())
}

/// INCR key
pub(crate) fn incr(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    add(store, &key, 1)
}

/// INCRBY key increment
pub(crate) fn incr_by(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let delta = parser.next_integer()?;
    parser.finish()?;

    add(store, &key, delta)
}

/// DECR key
pub(crate) fn decr(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    parser.finish()?;

    add(store, &key, -1)
}

/// DECRBY key decrement
pub(crate) fn decr_by(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let delta = parser.next_integer()?;
    parser.finish()?;

    let delta = delta.checked_neg().ok_or(StoreError::Overflow)?;

    add(store, &key, delta)
}

/// APPEND key value
pub(crate) fn append(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let key = parser.next_string()?;
    let suffix = parser.next_bytes()?;
    parser.finish()?;

    let len = store.strings_mut().append(&key, &suffix);

    Ok(len.into())
}

/// MSET key value [key value ...]
pub(crate) fn mset(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let pairs = parser.rest_pairs()?;

    store.strings_mut().set_many(pairs);

    Ok(Reply::ok())
}

/// MGET key [key ...]
pub(crate) fn mget(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let keys = parser.rest_strings()?;

    let values = match store.strings() {
        Some(strings) => strings.get_many(&keys),
        None => vec![None; keys.len()],
    };

    Ok(Reply::Sequence(
        values.into_iter().map(Reply::bytes_or_nil).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::{bytes, run};
    use crate::reply::Reply;
    use crate::store::Store;

    #[test]
    fn set_then_get() {
        let store = Store::new();

        assert_eq!(run(&store, &["SET", "key1", "1"]), Reply::ok());
        assert_eq!(run(&store, &["GET", "key1"]), bytes("1"));
    }

    #[test]
    fn get_missing_key_is_nil() {
        let store = Store::new();

        assert_eq!(run(&store, &["GET", "nope"]), Reply::Nil);
    }

    #[test]
    fn set_rejects_extra_arguments() {
        let store = Store::new();

        assert!(matches!(
            run(&store, &["SET", "k", "v", "EX"]),
            Reply::Error(_)
        ));
        assert_eq!(run(&store, &["EXISTS", "k"]), Reply::Boolean(false));
    }

    #[test]
    fn increment_sequence() {
        let store = Store::new();

        assert_eq!(run(&store, &["SET", "k", "10"]), Reply::ok());
        assert_eq!(run(&store, &["INCR", "k"]), Reply::Integer(11));
        assert_eq!(run(&store, &["INCRBY", "k", "5"]), Reply::Integer(16));
        assert_eq!(run(&store, &["DECR", "k"]), Reply::Integer(15));
        assert_eq!(run(&store, &["DECRBY", "k", "20"]), Reply::Integer(-5));
        assert_eq!(run(&store, &["GET", "k"]), bytes("-5"));
    }

    #[test]
    fn increment_non_integer_is_an_error() {
        let store = Store::new();
        run(&store, &["SET", "k", "abc"]);

        assert_eq!(
            run(&store, &["INCR", "k"]),
            Reply::Error("ERR value is not an integer or out of range".to_string())
        );
        assert_eq!(run(&store, &["GET", "k"]), bytes("abc"));
    }

    #[test]
    fn incrby_with_bad_delta() {
        let store = Store::new();

        assert!(matches!(
            run(&store, &["INCRBY", "k", "one"]),
            Reply::Error(_)
        ));
        assert_eq!(run(&store, &["GET", "k"]), Reply::Nil);
    }

    #[test]
    fn decrby_min_overflows() {
        let store = Store::new();

        assert_eq!(
            run(&store, &["DECRBY", "k", &i64::MIN.to_string()]),
            Reply::Error("ERR increment or decrement would overflow".to_string())
        );
    }

    #[test]
    fn del_and_exists() {
        let store = Store::new();
        run(&store, &["MSET", "a", "1", "b", "2"]);

        assert_eq!(run(&store, &["EXISTS", "a"]), Reply::Boolean(true));
        assert_eq!(run(&store, &["DEL", "a", "b", "c"]), Reply::Integer(2));
        assert_eq!(run(&store, &["EXISTS", "a"]), Reply::Boolean(false));
        assert_eq!(run(&store, &["DEL", "a"]), Reply::Integer(0));
    }

    #[test]
    fn append_returns_length() {
        let store = Store::new();

        assert_eq!(run(&store, &["APPEND", "k", "Hello"]), Reply::Integer(5));
        assert_eq!(run(&store, &["APPEND", "k", " World"]), Reply::Integer(11));
        assert_eq!(run(&store, &["GET", "k"]), bytes("Hello World"));
    }

    #[test]
    fn mset_needs_pairs() {
        let store = Store::new();

        assert!(matches!(
            run(&store, &["MSET", "a", "1", "b"]),
            Reply::Error(_)
        ));
        assert_eq!(run(&store, &["GET", "a"]), Reply::Nil);
    }

    #[test]
    fn mget_keeps_argument_order() {
        let store = Store::new();

        assert_eq!(
            run(&store, &["MGET", "a", "b"]),
            Reply::Sequence(vec![Reply::Nil, Reply::Nil])
        );

        run(&store, &["MSET", "a", "1", "b", "2"]);

        assert_eq!(
            run(&store, &["MGET", "b", "x", "a"]),
            Reply::Sequence(vec![bytes("2"), Reply::Nil, bytes("1")])
        );
    }
}
