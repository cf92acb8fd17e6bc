pub const PRESET_STANDARD: &str = r#"[output]
prefix = "iam_identity_center_report"
directory = "."
formats = ["csv", "xlsx", "html", "json"]

[aws]
# region = "us-east-1"
# profile = "audit"

[scoring]
# path = "permission_scoring.yaml"

[classification]
case_sensitive = false
default_classification = "Unclassified"

[[classification.rules]]
name = "Production"
include = ["prod", "prd", "live"]
exclude = ["non-prod", "nonprod", "preprod"]

[[classification.rules]]
name = "Staging"
include = ["stag", "stg", "preprod", "uat"]

[[classification.rules]]
name = "Development"
include = ["dev", "sandbox", "test", "qa"]

[[classification.rules]]
name = "Shared Services"
include = ["shared", "security", "log", "audit", "network"]
"#;

pub const PRESET_MINIMAL: &str = r#"[output]
prefix = "iam_identity_center_report"
formats = ["csv", "json"]

[classification]
default_classification = "Unclassified"
"#;

pub const PRESET_CI: &str = r#"[output]
prefix = "iam_identity_center_report"
directory = "reports"
formats = ["csv", "json"]

[classification]
default_classification = "Unclassified"

[[classification.rules]]
name = "Production"
include = ["prod", "prd"]
exclude = ["non-prod", "nonprod", "preprod"]

[[classification.rules]]
name = "Non-Production"
include = ["dev", "test", "stag", "sandbox", "qa", "uat"]

[profiles.nightly.output]
directory = "reports/nightly"
formats = ["csv", "xlsx", "html", "json"]
"#;
