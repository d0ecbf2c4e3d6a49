use serde::{Deserialize, Serialize};

/// 下拉框中的一个原始选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }

    /// 是否为“请选择”占位项
    ///
    /// 门户对占位项的标记并不统一：有时 value 为空或 "0"，有时只有文字里带 "Select"，
    /// 两种信号任一命中即视为占位项。
    pub fn is_sentinel(&self) -> bool {
        let value = self.value.trim();
        value.is_empty() || value == "0" || self.text.to_lowercase().contains("select")
    }
}

/// 过滤占位项，保持文档顺序，并去掉首尾空白
pub fn selectable_options(options: Vec<SelectOption>) -> Vec<SelectOption> {
    options
        .into_iter()
        .filter(|o| !o.is_sentinel())
        .map(|o| SelectOption::new(o.value.trim(), o.text.trim()))
        .collect()
}

/// 高等法院
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    /// 门户内部代码，后续所有请求都以它为键
    pub code: String,
    pub display_name: String,
}

impl From<SelectOption> for Court {
    fn from(option: SelectOption) -> Self {
        Self {
            code: option.value,
            display_name: option.text,
        }
    }
}

/// 法庭（court complex），代码只在所属法院内唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bench {
    pub code: String,
    pub display_name: String,
    pub parent_court_code: String,
}

impl Bench {
    pub fn from_option(option: SelectOption, parent_court_code: &str) -> Self {
        Self {
            code: option.value,
            display_name: option.text,
            parent_court_code: parent_court_code.to_string(),
        }
    }
}
