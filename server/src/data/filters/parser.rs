//! Parameter translation
//!
//! Turns a request's query parameters into whitelisted clauses plus the
//! `sort` and `limit` side-channels.
//!
//! Malformed or disallowed parameters are dropped with a warning. The only
//! hard failure is a date field whose value cannot be parsed.

use super::date::{ChronoDateParser, DateParser};
use super::operators::{Operator, comparator, split_conjunction, split_operator};
use super::params::{ParamValue, QueryParameters};
use super::types::{
    ClauseValue, FilterConfig, FilterError, ListValue, ParsedClause, Predicate, SortDirection,
    SortSpec, Translation,
};

/// Reserved parameter selecting the sort order (`field` or `field,direction`)
pub const SORT_PARAM: &str = "sort";

/// Reserved parameter capping the number of rows
pub const LIMIT_PARAM: &str = "limit";

/// Literal value that turns a non-text-match filter into a null test
const NULL_LITERAL: &str = "null";

/// Translate parameters with the default date parser
pub fn translate(
    params: &QueryParameters,
    config: &FilterConfig,
) -> Result<Translation, FilterError> {
    translate_with(params, config, &ChronoDateParser)
}

/// Translate parameters in input order
pub fn translate_with(
    params: &QueryParameters,
    config: &FilterConfig,
    dates: &dyn DateParser,
) -> Result<Translation, FilterError> {
    let mut translation = Translation::default();

    for (name, value) in params.iter() {
        match name {
            SORT_PARAM => {
                translation.sort = parse_sort(value, config);
                continue;
            }
            LIMIT_PARAM => {
                translation.limit = parse_limit(value);
                continue;
            }
            _ => {}
        }

        if let Some(clause) = translate_parameter(name, value, config, dates)? {
            translation.clauses.push(clause);
        }
    }

    tracing::trace!(
        clauses = translation.clauses.len(),
        sort = ?translation.sort,
        limit = ?translation.limit,
        "Translated query parameters"
    );
    Ok(translation)
}

fn translate_parameter(
    name: &str,
    value: &ParamValue,
    config: &FilterConfig,
    dates: &dyn DateParser,
) -> Result<Option<ParsedClause>, FilterError> {
    let (base, operator) = split_operator(name);
    let (field, conjunction) = split_conjunction(base);

    if !config.allows(field) {
        tracing::warn!(parameter = %name, %field, "Ignoring filter on field not in whitelist");
        return Ok(None);
    }

    let predicate = match value {
        ParamValue::Single(raw) => Some(scalar_predicate(
            field,
            raw,
            operator,
            config.is_date(field),
            dates,
        )?),
        ParamValue::Many(raw) => {
            list_predicate(name, field, raw, operator, config.is_date(field), dates)?
        }
    };

    Ok(predicate.map(|predicate| ParsedClause {
        field: field.to_string(),
        conjunction,
        predicate,
    }))
}

fn scalar_predicate(
    field: &str,
    raw: &str,
    operator: Option<Operator>,
    is_date: bool,
    dates: &dyn DateParser,
) -> Result<Predicate, FilterError> {
    let value = if is_date {
        ClauseValue::Date(dates.parse(field, raw)?)
    } else {
        ClauseValue::Text(raw.to_string())
    };

    let value = match operator {
        Some(op) if op.is_text_match() => ClauseValue::Text(op.wrap_wildcards(&value.to_string())),
        _ => value,
    };

    // compared after wrapping, so text-match operators never become null tests
    if matches!(&value, ClauseValue::Text(v) if v == NULL_LITERAL) {
        return Ok(Predicate::IsNull);
    }

    Ok(Predicate::Compare {
        operator: comparator(operator),
        value,
    })
}

fn list_predicate(
    name: &str,
    field: &str,
    raw: &[String],
    operator: Option<Operator>,
    is_date: bool,
    dates: &dyn DateParser,
) -> Result<Option<Predicate>, FilterError> {
    let values = if is_date {
        ListValue::Date(
            raw.iter()
                .map(|v| dates.parse(field, v))
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        ListValue::Text(raw.to_vec())
    };

    match operator {
        Some(Operator::In) => Ok(Some(Predicate::In { values })),
        Some(Operator::NotIn) => Ok(Some(Predicate::NotIn { values })),
        _ => {
            tracing::warn!(parameter = %name, "Ignoring array value for non-membership filter");
            Ok(None)
        }
    }
}

fn parse_sort(value: &ParamValue, config: &FilterConfig) -> Option<SortSpec> {
    let raw = value.last()?;

    // segments past the direction are ignored
    let mut segments = raw.split(',').map(str::trim);
    let field = segments.next().unwrap_or_default();
    let direction = segments.next().unwrap_or_default();

    if !config.allows(field) {
        tracing::warn!(%field, "Ignoring sort on field not in whitelist");
        return None;
    }

    let direction = if direction.is_empty() {
        SortDirection::Asc
    } else {
        match SortDirection::parse(direction) {
            Some(direction) => direction,
            None => {
                tracing::warn!(%field, %direction, "Ignoring sort with unknown direction");
                return None;
            }
        }
    };

    Some(SortSpec {
        field: field.to_string(),
        direction,
    })
}

fn parse_limit(value: &ParamValue) -> Option<u64> {
    let raw = value.last()?;
    match raw.trim().parse::<u64>() {
        Ok(limit) => Some(limit),
        Err(_) => {
            tracing::warn!(limit = %raw, "Ignoring non-numeric limit");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::types::{ComparisonOp, Conjunction};
    use chrono::{TimeZone, Utc};

    fn config() -> FilterConfig {
        FilterConfig::new(
            ["name", "age", "status", "email", "created_at"],
            ["created_at"],
        )
    }

    fn run(pairs: &[(&str, &str)]) -> Translation {
        translate(&QueryParameters::from_pairs(pairs.iter().copied()), &config()).unwrap()
    }

    fn text(value: &str) -> ClauseValue {
        ClauseValue::Text(value.to_string())
    }

    #[test]
    fn equality_by_default() {
        let t = run(&[("name", "alice")]);
        assert_eq!(
            t.clauses,
            vec![ParsedClause::compare(
                "name",
                ComparisonOp::Eq,
                text("alice"),
                Conjunction::And
            )]
        );
    }

    #[test]
    fn or_prefix_with_operator() {
        let t = run(&[("or_age_gte", "30")]);
        assert_eq!(
            t.clauses,
            vec![ParsedClause::compare(
                "age",
                ComparisonOp::Gte,
                text("30"),
                Conjunction::Or
            )]
        );
    }

    #[test]
    fn text_match_wildcards() {
        let t = run(&[
            ("name_contains", "abc"),
            ("name_starts_with", "abc"),
            ("name_ends_with", "abc"),
            ("name_not_contains", "x"),
            ("name_not_starts_with", "x"),
            ("name_not_ends_with", "x"),
        ]);
        let expected = [
            (ComparisonOp::Like, "%abc%"),
            (ComparisonOp::Like, "abc%"),
            (ComparisonOp::Like, "%abc"),
            (ComparisonOp::NotLike, "%x%"),
            (ComparisonOp::NotLike, "x%"),
            (ComparisonOp::NotLike, "%x"),
        ];
        assert_eq!(t.clauses.len(), expected.len());
        for (clause, (op, value)) in t.clauses.iter().zip(expected) {
            assert_eq!(
                clause.predicate,
                Predicate::Compare {
                    operator: op,
                    value: text(value)
                }
            );
        }
    }

    #[test]
    fn null_literal_wins_over_comparison_operators() {
        let t = run(&[
            ("name", "null"),
            ("or_age_gt", "null"),
            ("email_contains", "null"),
            ("status_not", "null"),
        ]);
        assert_eq!(
            t.clauses,
            vec![
                ParsedClause::is_null("name", Conjunction::And),
                ParsedClause::is_null("age", Conjunction::Or),
                ParsedClause::compare(
                    "email",
                    ComparisonOp::Like,
                    text("%null%"),
                    Conjunction::And
                ),
                ParsedClause::is_null("status", Conjunction::And),
            ]
        );
    }

    #[test]
    fn text_match_operators_never_test_null() {
        let t = run(&[
            ("name_contains", "null"),
            ("or_email_starts_with", "null"),
            ("status_not_ends_with", "null"),
        ]);
        let expected = [
            (ComparisonOp::Like, "%null%", Conjunction::And),
            (ComparisonOp::Like, "null%", Conjunction::Or),
            (ComparisonOp::NotLike, "%null", Conjunction::And),
        ];
        assert_eq!(t.clauses.len(), expected.len());
        for (clause, (op, value, conjunction)) in t.clauses.iter().zip(expected) {
            assert_eq!(clause.conjunction, conjunction);
            assert_eq!(
                clause.predicate,
                Predicate::Compare {
                    operator: op,
                    value: text(value)
                }
            );
        }
    }

    #[test]
    fn non_whitelisted_fields_are_dropped() {
        let t = run(&[
            ("password", "x"),
            ("or_password_contains", "x"),
            ("password_in[]", "x"),
            ("name", "ok"),
        ]);
        assert_eq!(t.clauses.len(), 1);
        assert!(t.clauses.iter().all(|c| c.field != "password"));
    }

    #[test]
    fn disguised_names_cannot_widen_whitelist() {
        // whitelist is checked against the fully stripped name
        let t = run(&[("name_secret", "x"), ("or_", "x"), ("_gte", "1")]);
        assert!(t.clauses.is_empty());
    }

    #[test]
    fn empty_whitelist_rejects_everything() {
        let params = QueryParameters::from_pairs([("name", "x"), ("age_gt", "1")]);
        let t = translate(&params, &FilterConfig::default()).unwrap();
        assert!(t.clauses.is_empty());
    }

    #[test]
    fn membership_on_arrays() {
        let t = run(&[
            ("status_in[]", "a"),
            ("status_in[]", "b"),
            ("age_not_in", "1,2"),
        ]);
        assert_eq!(
            t.clauses[0].predicate,
            Predicate::In {
                values: ListValue::Text(vec!["a".to_string(), "b".to_string()])
            }
        );
        assert_eq!(
            t.clauses[1].predicate,
            Predicate::NotIn {
                values: ListValue::Text(vec!["1".to_string(), "2".to_string()])
            }
        );
    }

    #[test]
    fn arrays_with_other_operators_emit_nothing() {
        let t = run(&[
            ("name[]", "a"),
            ("age_gte[]", "1"),
            ("name_contains[]", "x"),
        ]);
        assert!(t.clauses.is_empty());
    }

    #[test]
    fn scalar_membership_falls_back_to_equality() {
        let t = run(&[("status_in", "active")]);
        assert_eq!(
            t.clauses[0].predicate,
            Predicate::Compare {
                operator: ComparisonOp::Eq,
                value: text("active")
            }
        );
    }

    #[test]
    fn sort_with_and_without_direction() {
        let t = run(&[("sort", "name,desc")]);
        assert_eq!(
            t.sort,
            Some(SortSpec {
                field: "name".to_string(),
                direction: SortDirection::Desc
            })
        );

        let t = run(&[("sort", "name")]);
        assert_eq!(
            t.sort,
            Some(SortSpec {
                field: "name".to_string(),
                direction: SortDirection::Asc
            })
        );

        let t = run(&[("sort", "age,")]);
        assert_eq!(t.sort.unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn sort_on_unknown_field_or_direction_is_ignored() {
        assert_eq!(run(&[("sort", "password,desc")]).sort, None);
        assert_eq!(run(&[("sort", "name,sideways")]).sort, None);
    }

    #[test]
    fn repeated_sort_keeps_last() {
        let t = run(&[("sort", "name"), ("sort", "age,desc")]);
        assert_eq!(
            t.sort,
            Some(SortSpec {
                field: "age".to_string(),
                direction: SortDirection::Desc,
            })
        );
    }

    #[test]
    fn sort_ignores_segments_after_direction() {
        let t = run(&[("sort", "name,desc,x")]);
        assert_eq!(
            t.sort,
            Some(SortSpec {
                field: "name".to_string(),
                direction: SortDirection::Desc,
            })
        );
    }

    #[test]
    fn repeated_limit_keeps_last() {
        assert_eq!(run(&[("limit", "5"), ("limit", "10")]).limit, Some(10));
        assert_eq!(run(&[("limit", "5"), ("limit", "ten")]).limit, None);
    }

    #[test]
    fn limit_is_passed_through() {
        assert_eq!(run(&[("limit", "25")]).limit, Some(25));
        assert_eq!(run(&[("limit", "1000000")]).limit, Some(1_000_000));
        assert_eq!(run(&[("limit", "ten")]).limit, None);
    }

    #[test]
    fn reserved_params_are_diverted_regardless_of_position() {
        let t = run(&[
            ("sort", "age,desc"),
            ("name", "a"),
            ("limit", "5"),
            ("age_lt", "40"),
        ]);
        let fields: Vec<&str> = t.clauses.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "age"]);
        assert!(t.sort.is_some());
        assert_eq!(t.limit, Some(5));
    }

    #[test]
    fn clause_order_follows_input_order() {
        let t = run(&[
            ("status", "x"),
            ("or_name", "y"),
            ("age_lte", "3"),
            ("email_ends_with", "@example.com"),
        ]);
        let fields: Vec<&str> = t.clauses.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["status", "name", "age", "email"]);
    }

    #[test]
    fn date_fields_are_coerced() {
        let t = run(&[("created_at_gte", "2024-01-01")]);
        assert_eq!(
            t.clauses[0].predicate,
            Predicate::Compare {
                operator: ComparisonOp::Gte,
                value: ClauseValue::Date(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            }
        );
    }

    #[test]
    fn date_text_match_uses_rendered_date() {
        let t = run(&[("created_at_starts_with", "2024-01-01")]);
        assert_eq!(
            t.clauses[0].predicate,
            Predicate::Compare {
                operator: ComparisonOp::Like,
                value: text("2024-01-01 00:00:00%")
            }
        );
    }

    #[test]
    fn invalid_date_is_an_error() {
        let params = QueryParameters::from_pairs([("name", "a"), ("created_at_lt", "soon")]);
        let err = translate(&params, &config()).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidDateFormat {
                field: "created_at".to_string(),
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn invalid_date_in_array_is_an_error() {
        let params = QueryParameters::from_pairs([
            ("created_at_in[]", "2024-01-01"),
            ("created_at_in[]", "nope"),
        ]);
        assert!(translate(&params, &config()).is_err());
    }

    #[test]
    fn date_membership_parses_each_value() {
        let t = run(&[("created_at_in", "2024-01-01,2024-02-01")]);
        match &t.clauses[0].predicate {
            Predicate::In {
                values: ListValue::Date(dates),
            } => assert_eq!(dates.len(), 2),
            other => panic!("unexpected predicate: {:?}", other),
        }
    }

    #[test]
    fn unwhitelisted_date_like_field_is_not_parsed() {
        // dropped before coercion, so no error
        let params = QueryParameters::from_pairs([("updated_at", "garbage")]);
        let cfg = FilterConfig::new(["name"], ["updated_at"]);
        assert!(translate(&params, &cfg).unwrap().clauses.is_empty());
    }

    #[test]
    fn translation_is_idempotent() {
        let params = QueryParameters::from_pairs([
            ("or_name_contains", "a"),
            ("status_in", "x,y"),
            ("sort", "age,desc"),
            ("limit", "3"),
        ]);
        let first = translate(&params, &config()).unwrap();
        let second = translate(&params, &config()).unwrap();
        assert_eq!(first, second);
    }

    struct FixedDate;

    impl DateParser for FixedDate {
        fn parse(&self, _field: &str, _value: &str) -> Result<chrono::DateTime<Utc>, FilterError> {
            Ok(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
        }
    }

    #[test]
    fn custom_date_parser_is_used() {
        let params = QueryParameters::from_pairs([("created_at", "whenever")]);
        let t = translate_with(&params, &config(), &FixedDate).unwrap();
        assert_eq!(
            t.clauses[0].predicate,
            Predicate::Compare {
                operator: ComparisonOp::Eq,
                value: ClauseValue::Date(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
            }
        );
    }
}
