//! `indexer_error!` and `bail!`, the shorthands every module uses to raise an
//! [`crate::error::IndexerError`] at the callsite.

/// Builds an [`crate::error::IndexerError`] whose location is the macro callsite.
///
/// Forms, from shortest to longest:
///
/// - `indexer_error!(kind, "description")`
/// - `indexer_error!(kind, "description", value)`: `value` is rendered with `to_string()`
/// - `indexer_error!(kind, "description", detail = owned_string)`: no extra allocation
///
/// Each form accepts a trailing `source: err` keeping the underlying failure reachable through
/// [`std::error::Error::source`].
#[macro_export]
macro_rules! indexer_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::IndexerError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::IndexerError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::IndexerError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Early return of `Err(indexer_error!(..))`.
///
/// Usable as the value of a match arm or a `let ... else` branch, since it expands to a
/// `return` expression.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc, detail = $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!(
            $kind,
            $desc,
            detail = $detail,
            source: $source
        ))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::indexer_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::error::{ErrorKind, IndexerResult};

    fn parse_retries(raw: &str) -> IndexerResult<u32> {
        match raw.parse::<u32>() {
            Ok(retries) => Ok(retries),
            Err(err) => bail!(
                ErrorKind::InvalidConfiguration,
                "Retries are not a number",
                format!("got `{raw}`"),
                source: err
            ),
        }
    }

    #[test]
    fn owned_detail_is_moved() {
        let detail = String::from("field `id` is missing");
        let err = indexer_error!(ErrorKind::FieldNotFound, "Field missing", detail = detail);

        assert_eq!(err.detail(), Some("field `id` is missing"));
        assert!(err.source().is_none());
    }

    #[test]
    fn bail_returns_with_detail_and_source() {
        let err = parse_retries("three").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(err.detail(), Some("got `three`"));
        assert!(err.source().is_some());
        assert_eq!(err.location().file(), file!());
        assert_eq!(parse_retries("2").unwrap(), 2);
    }
}
