use std::rc::Rc;

use proptest::prelude::*;

use ouro::clock::FixedClock;
use ouro::env::{BufferPrinter, Env};
use ouro::os::MemFs;
use ouro::pattern::{general_match, pattern_is_valid, LikeMatcher};
use ouro::script::context::FileContext;
use ouro::script::definition::{collect, Definition, OsDefinition, OsKind};
use ouro::script::period::{Period, PeriodUnit};
use ouro::script::{Context, Parser, Script, Time};
use ouro::var::var;

fn env_with(fs: MemFs) -> Env {
    Env::new(Rc::new(FixedClock(Time::clock(15, 6, 2024, 10, 30, 0))), Rc::new(fs))
        .with_printer(Rc::new(BufferPrinter::new()))
}

fn evaluate(mut parser: Parser, src: &str) -> Result<String, String> {
    let env = parser.env.clone();
    parser
        .expression(src)
        .and_then(|mut typed| typed.evaluate(&env))
        .map(|v| v.to_string())
        .map_err(|e| e.message())
}

fn unit() -> impl Strategy<Value = PeriodUnit> {
    prop_oneof![
        Just(PeriodUnit::Years),
        Just(PeriodUnit::Months),
        Just(PeriodUnit::Weeks),
        Just(PeriodUnit::Days),
        Just(PeriodUnit::Hours),
        Just(PeriodUnit::Minutes),
        Just(PeriodUnit::Seconds),
    ]
}

fn fixed_unit() -> impl Strategy<Value = PeriodUnit> {
    prop_oneof![
        Just(PeriodUnit::Weeks),
        Just(PeriodUnit::Days),
        Just(PeriodUnit::Hours),
        Just(PeriodUnit::Minutes),
        Just(PeriodUnit::Seconds),
    ]
}

proptest! {
    /// Every specialised LIKE matcher agrees with the general matcher.
    #[test]
    fn like_specialised_matches_general(pattern in "[ab%_#\\[\\]^-]{0,8}", value in "[ab0-9]{0,8}") {
        prop_assume!(pattern_is_valid(&pattern));
        let matcher = LikeMatcher::compile(&pattern);
        prop_assert_eq!(
            matcher.is_match(&value),
            general_match(&pattern, &value),
            "matcher {} on pattern {:?}", matcher.name(), pattern
        );
    }
}

proptest! {
    /// Folding constant subtrees never changes a result, only when an
    /// error is reported.
    #[test]
    fn folding_is_transparent(
        first in -50i64..50,
        rest in prop::collection::vec((prop_oneof![Just('+'), Just('-'), Just('*'), Just('/'), Just('%')], -50i64..50), 0..6),
    ) {
        let mut src = format!("({first})");
        for (op, n) in rest {
            src.push_str(&format!(" {op} ({n})"));
        }
        let ctx = || Context::new("/", Vec::new());
        let folded = evaluate(Parser::new(ctx(), env_with(MemFs::new())), &src);
        let plain = evaluate(Parser::new(ctx(), env_with(MemFs::new())).without_folding(), &src);
        match (folded, plain) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "{src}: folded {a:?}, unfolded {b:?}"),
        }
    }
}

proptest! {
    /// Period comparison is antisymmetric and agrees with the amounts for
    /// one unit.
    #[test]
    fn period_comparison_is_consistent(a in -100i64..100, ua in unit(), b in -100i64..100, ub in unit()) {
        let pa = Period::unit(a, ua);
        let pb = Period::unit(b, ub);
        prop_assert_eq!(pa.compare(&pb), pb.compare(&pa).reverse());
        if ua == ub {
            prop_assert_eq!(pa.compare(&pb), a.cmp(&b));
        }
    }

    /// Units of fixed length compare by their length in seconds.
    #[test]
    fn fixed_units_compare_by_length(a in -100i64..100, ua in fixed_unit(), b in -100i64..100, ub in fixed_unit()) {
        let pa = Period::unit(a, ua);
        let pb = Period::unit(b, ub);
        prop_assert_eq!(pa.compare(&pb), (a as i128 * ua.seconds()).cmp(&(b as i128 * ub.seconds())));
    }
}

proptest! {
    /// A definition enumerates the same elements after running out and
    /// after a reset in the middle.
    #[test]
    fn definitions_restart(names in prop::collection::btree_set("[a-z]{1,6}", 1..8), stop in 0usize..8) {
        let stamp = Time::date(1, 1, 2024);
        let mut fs = MemFs::new();
        for n in &names {
            fs.add_file(&format!("/w/{n}.txt"), 1, stamp);
        }
        let env = env_with(fs);
        let ctx = FileContext::for_paths(var("/w".to_string()));
        let mut def = OsDefinition::new(OsKind::Files, false, ctx);
        let expected: Vec<String> = names.iter().map(|n| format!("{n}.txt")).collect();

        prop_assert_eq!(collect(&mut def, &env).unwrap(), expected.clone());
        prop_assert_eq!(collect(&mut def, &env).unwrap(), expected.clone());
        for _ in 0..stop {
            if !def.has_next(&env).unwrap() {
                break;
            }
        }
        def.reset();
        prop_assert_eq!(collect(&mut def, &env).unwrap(), expected);
    }

    /// A cancelled run yields nothing, and a reset token brings every
    /// element back.
    #[test]
    fn cancellation_is_sound(names in prop::collection::btree_set("[a-z]{1,6}", 1..8)) {
        let stamp = Time::date(1, 1, 2024);
        let mut fs = MemFs::new();
        for n in &names {
            fs.add_file(&format!("/w/{n}"), 1, stamp);
        }
        let env = env_with(fs);
        let ctx = FileContext::for_paths(var("/w".to_string()));
        let mut def = OsDefinition::new(OsKind::All, true, ctx);
        prop_assert!(def.has_next(&env).unwrap());
        env.cancel.cancel();
        prop_assert!(!def.has_next(&env).unwrap());
        env.cancel.reset();
        prop_assert_eq!(collect(&mut def, &env).unwrap().len(), names.len());
    }
}

proptest! {
    /// `order by` sorts, and the descending order is the exact reverse for
    /// distinct keys.
    #[test]
    fn order_by_sorts(values in prop::collection::btree_set(-1000i64..1000, 2..12)) {
        // set iteration is sorted, so shuffle deterministically by reversing halves
        let mut input: Vec<i64> = values.iter().copied().collect();
        let half = input.len() / 2;
        input[..half].reverse();
        input.reverse();
        let literal = input.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
        let ascending: Vec<String> = values.iter().map(i64::to_string).collect();
        let ctx = || Context::new("/", Vec::new());

        let asc = evaluate(Parser::new(ctx(), env_with(MemFs::new())), &format!("({literal}) order by this")).unwrap();
        prop_assert_eq!(asc, ascending.join(", "));
        let desc = evaluate(Parser::new(ctx(), env_with(MemFs::new())), &format!("({literal}) order by this desc")).unwrap();
        let descending: Vec<String> = ascending.into_iter().rev().collect();
        prop_assert_eq!(desc, descending.join(", "));
    }
}

proptest! {
    /// The parser answers every input with a script or an error.
    #[test]
    fn parser_does_not_panic(s in "\\PC{0,60}") {
        let _ = Script::parse(&s, Context::new("/w", Vec::new()), env_with(MemFs::new()));
    }

    /// Same for inputs made of the language's own tokens.
    #[test]
    fn parser_does_not_panic_on_tokens(
        parts in prop::collection::vec(prop_oneof![
            Just("files"), Just("where"), Just("order"), Just("by"), Just("("), Just(")"),
            Just(","), Just("+"), Just("-"), Just("?"), Just(":"), Just("="), Just("in"),
            Just("like"), Just("'a*'"), Just("1"), Just("june"), Just("days"), Just("not"),
            Just("and"), Just("{"), Just("}"), Just("print"), Just("x"), Just("count"), Just("["), Just("]"),
        ], 0..14)
    ) {
        let src = parts.join(" ");
        let _ = Script::parse(&src, Context::new("/w", Vec::new()), env_with(MemFs::new()));
    }
}
