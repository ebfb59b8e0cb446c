//! Property tests for path algebra.

use gamevfs_path::{Path, PathContext, PathKind};
use proptest::prelude::*;

fn segment(allow_drive: bool, allow_home: bool) -> BoxedStrategy<String> {
    let mut names = vec!["a", "B", "tex", "Hero.png", ".", "..", " a", "b "];
    if allow_drive {
        names.push("c:");
    }
    if allow_home {
        names.push("~");
    }
    proptest::sample::select(names)
        .prop_map(str::to_string)
        .boxed()
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("/"), Just("\\"), Just("//")]
}

/// Path text with random separators, optional leading/trailing separator.
fn path_text(allow_drive: bool, allow_root: bool) -> impl Strategy<Value = String> {
    path_text_with(allow_drive, allow_root, true)
}

fn path_text_with(
    allow_drive: bool,
    allow_root: bool,
    allow_home: bool,
) -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        prop::collection::vec((segment(allow_drive, allow_home), separator()), 0..8),
        any::<bool>(),
    )
        .prop_map(move |(leading, parts, trailing)| {
            let mut text = String::new();
            if leading && allow_root {
                text.push('/');
            }
            for (i, (segment, sep)) in parts.iter().enumerate() {
                if i > 0 {
                    text.push_str(sep);
                }
                text.push_str(segment);
            }
            if trailing && !parts.is_empty() {
                text.push('/');
            }
            text
        })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(text in path_text(true, true)) {
        let once = Path::parse(&text).normalize();
        prop_assert_eq!(once.normalize(), once);
    }

    #[test]
    fn combine_is_associative(
        a in path_text(true, true),
        b in path_text(false, false),
        c in path_text(false, false),
    ) {
        let (a, b, c) = (Path::parse(&a), Path::parse(&b), Path::parse(&c));
        let right = Path::combine([&a, &Path::combine([&b, &c]).unwrap()]).unwrap();
        let left = Path::combine([&Path::combine([&a, &b]).unwrap(), &c]).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn posix_rendering_round_trips(text in path_text(true, true)) {
        let normalized = Path::parse(&text).normalize();
        prop_assume!(normalized.kind() != PathKind::Drive);
        let reparsed = Path::parse(&normalized.to_posix_string()).normalize();
        prop_assert_eq!(reparsed, normalized);
    }

    #[test]
    fn inbound_relative_paths_have_no_leading_parent(text in path_text(false, false)) {
        let path = Path::parse(&text);
        let normalized = path.normalize();
        let leading_parent = normalized.segments().first().is_some_and(|s| s == "..")
            || normalized.segments().get(1).is_some_and(|s| s == "..");
        if path.stays_inbound() {
            prop_assert!(!leading_parent);
        }
    }

    #[test]
    fn relative_to_then_join_returns_to_path(
        base in path_text_with(false, false, false),
        target in path_text_with(false, false, false),
    ) {
        let ctx = PathContext::new(Path::parse("/work/game")).unwrap();
        let (base, target) = (Path::parse(&base), Path::parse(&target));
        prop_assume!(base.stays_inbound() && target.stays_inbound());

        let rel = target.relative_to_in(&base, true, &ctx).unwrap();
        let back = base.absolute_in(&ctx).join(&rel).unwrap();
        prop_assert!(back.equals_in(&target, true, &ctx));
    }
}
