#![no_main]

use libfuzzer_sys::fuzz_target;
use sso_audit::engine::{allowed_actions, PolicyAnalyzer, ScoringTable};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = allowed_actions(text);
        if let Ok(table) = ScoringTable::builtin() {
            let analyzer = PolicyAnalyzer::new(&table);
            let _ = analyzer.analyze_permission_set(&[text.to_string()], Some(text));
        }
    }
});
