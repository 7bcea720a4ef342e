use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Where the Agent produces the execution report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Cloud,
    Local,
    #[default]
    CloudAndLocal,
}

/// Report identity of a development session.
///
/// Two clients asking for equal settings may share a single Agent session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub project_name: Option<String>,
    pub job_name: Option<String>,
    pub report_type: ReportType,
    pub report_name: Option<String>,
    pub report_path: Option<String>,
}

impl ReportSettings {
    pub fn new(project_name: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            project_name: Some(project_name.into()),
            job_name: Some(job_name.into()),
            ..Default::default()
        }
    }

    pub fn with_report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }

    pub fn with_report_name(mut self, name: impl Into<String>) -> Self {
        self.report_name = Some(name.into());
        self
    }

    pub fn with_report_path(mut self, path: impl Into<String>) -> Self {
        self.report_path = Some(path.into());
        self
    }
}

/// Wire protocol variant negotiated for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    W3C,
    OSS,
}

impl Dialect {
    pub fn from_agent(value: Option<&str>) -> Self {
        match value {
            Some("W3C") => Dialect::W3C,
            _ => Dialect::OSS,
        }
    }

    pub fn is_w3c(&self) -> bool {
        matches!(self, Dialect::W3C)
    }
}

/// Locator strategies understood by the Agent's reporting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindByType {
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "NAME")]
    Name,
    #[serde(rename = "CLASSNAME")]
    ClassName,
    #[serde(rename = "CSSSELECTOR")]
    CssSelector,
    #[serde(rename = "LINKTEXT")]
    LinkText,
    #[serde(rename = "PARTIALLINKTEXT")]
    PartialLinkText,
    #[serde(rename = "TAG_NAME")]
    TagName,
    #[serde(rename = "XPATH")]
    XPath,
    #[serde(rename = "ACCESSIBILITYID")]
    AccessibilityId,
    #[serde(rename = "IOSUIAUTOMATION")]
    IosUiAutomation,
    #[serde(rename = "ANDROIDUIAUTOMATOR")]
    AndroidUiAutomator,
    #[serde(rename = "IOSPREDICATE")]
    IosPredicate,
    #[serde(rename = "IOSCLASSCHAIN")]
    IosClassChain,
}

/// Element search criteria attached to step reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSearchCriteria {
    #[serde(rename = "byType")]
    pub find_by_type: FindByType,
    #[serde(rename = "byValue")]
    pub by_value: String,
    pub index: i64,
}

impl ElementSearchCriteria {
    pub fn new(find_by_type: FindByType, by_value: impl Into<String>) -> Self {
        Self {
            find_by_type,
            by_value: by_value.into(),
            index: -1,
        }
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "byType": self.find_by_type,
            "byValue": self.by_value,
            "index": self.index,
        })
    }
}

/// Locator strategy as used by driver code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum By {
    Id,
    Name,
    XPath,
    ClassName,
    CssSelector,
    LinkText,
    PartialLinkText,
    TagName,
    AccessibilityId,
    IosPredicate,
}

impl By {
    pub fn search_criteria(&self, value: &str) -> ElementSearchCriteria {
        let find_by_type = match self {
            By::Id => FindByType::Id,
            By::Name => FindByType::Name,
            By::XPath => FindByType::XPath,
            By::ClassName => FindByType::ClassName,
            By::CssSelector => FindByType::CssSelector,
            By::LinkText => FindByType::LinkText,
            By::PartialLinkText => FindByType::PartialLinkText,
            By::TagName => FindByType::TagName,
            By::AccessibilityId => FindByType::AccessibilityId,
            By::IosPredicate => FindByType::IosPredicate,
        };
        ElementSearchCriteria::new(find_by_type, value)
    }

    /// Locator object understood by addon actions.
    pub fn addon_locator(&self, value: &str) -> Value {
        let key = match self {
            By::Id => "id",
            By::Name => "name",
            By::XPath => "xpath",
            By::ClassName => "className",
            By::CssSelector => "cssSelector",
            By::LinkText => "linkText",
            By::PartialLinkText => "partialLinkText",
            By::TagName => "tagName",
            By::AccessibilityId => "accessibilityId",
            By::IosPredicate => "iosPredicate",
        };
        let mut locator = serde_json::Map::new();
        locator.insert(key.to_string(), Value::String(value.to_string()));
        Value::Object(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_criteria_json_shape() {
        let criteria = ElementSearchCriteria::new(FindByType::CssSelector, "#login");
        assert_eq!(
            criteria.to_json(),
            json!({"byType": "CSSSELECTOR", "byValue": "#login", "index": -1})
        );

        let criteria = ElementSearchCriteria::new(FindByType::TagName, "input").with_index(2);
        assert_eq!(
            criteria.to_json(),
            json!({"byType": "TAG_NAME", "byValue": "input", "index": 2})
        );
        assert_eq!(serde_json::to_value(&criteria).unwrap(), criteria.to_json());
    }

    #[test]
    fn test_report_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ReportType::CloudAndLocal).unwrap(),
            json!("CLOUD_AND_LOCAL")
        );
        assert_eq!(serde_json::to_value(ReportType::Local).unwrap(), json!("LOCAL"));
    }

    #[test]
    fn test_report_settings_equality() {
        let a = ReportSettings::new("project", "job");
        let b = ReportSettings::new("project", "job");
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_report_type(ReportType::Local));
        assert_ne!(a, ReportSettings::new("project", "other job"));
    }

    #[test]
    fn test_by_translations() {
        assert_eq!(By::CssSelector.addon_locator(".btn"), json!({"cssSelector": ".btn"}));
        assert_eq!(By::Id.search_criteria("user").find_by_type, FindByType::Id);
        assert_eq!(By::AccessibilityId.search_criteria("ok").index, -1);
    }

    #[test]
    fn test_dialect_from_agent() {
        assert_eq!(Dialect::from_agent(Some("W3C")), Dialect::W3C);
        assert_eq!(Dialect::from_agent(Some("OSS")), Dialect::OSS);
        assert_eq!(Dialect::from_agent(None), Dialect::OSS);
    }
}
