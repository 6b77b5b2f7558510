#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pldebug::backend::Backtrace;
use pldebug::PlKind;

#[derive(Arbitrary, Debug)]
struct BacktraceFuzzInput {
    // Object type as the debug service spells it
    kind: String,
    pl_name: String,
    package_name: Option<String>,
    line_num: u32,
}

fuzz_target!(|input: BacktraceFuzzInput| {
    let Some(kind) = PlKind::parse(&input.kind) else {
        return;
    };
    assert_eq!(PlKind::parse(kind.as_str()), Some(kind));

    let backtrace = Backtrace {
        package_name: input.package_name.clone(),
        pl_name: input.pl_name,
        kind,
        line_num: input.line_num,
    };
    let identity = backtrace.identity();

    // Anything inside a package resolves to the frame holding the package source
    let in_package = input.package_name.as_deref().map_or(false, |p| !p.is_empty());
    if in_package && kind != PlKind::AnonymousBlock {
        assert!(identity.kind.is_package());
        assert_eq!(identity.package_name.as_deref(), Some(identity.name.as_str()));
    }
    let _ = identity.to_string();
});
