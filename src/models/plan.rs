use crate::models::{Bench, SearchQuery, SearchType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 搜索计划：要查哪些法院、哪些关键词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    #[serde(deserialize_with = "deserialize_year")]
    pub year: String,
    /// 目标法院代码，为空表示全部法院
    #[serde(default)]
    pub courts: Vec<String>,
    #[serde(default)]
    pub party_names: Vec<String>,
    #[serde(default)]
    pub case_numbers: Vec<String>,
}

impl Default for SearchPlan {
    fn default() -> Self {
        Self {
            year: "2024".to_string(),
            courts: vec!["26".to_string(), "3".to_string()],
            party_names: vec!["kumar".to_string()],
            case_numbers: vec!["123".to_string()],
        }
    }
}

impl SearchPlan {
    /// 该法院是否在计划内
    pub fn includes_court(&self, court_code: &str) -> bool {
        self.courts.is_empty() || self.courts.iter().any(|c| c == court_code)
    }

    /// 为一个法庭展开全部查询
    pub fn queries_for(&self, bench: &Bench) -> Vec<SearchQuery> {
        let party = self
            .party_names
            .iter()
            .map(|q| (SearchType::PartyName, q));
        let case_no = self
            .case_numbers
            .iter()
            .map(|q| (SearchType::CaseNumber, q));

        party
            .chain(case_no)
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(search_type, text)| {
                SearchQuery::new(
                    bench.parent_court_code.clone(),
                    bench.code.clone(),
                    search_type,
                    text.trim(),
                    self.year.clone(),
                )
            })
            .collect()
    }
}

/// 从 TOML 文件加载搜索计划；文件不存在时使用默认计划
pub async fn load_search_plan(path: &Path) -> Result<SearchPlan> {
    if !path.exists() {
        tracing::warn!("搜索计划 {} 不存在，使用默认计划", path.display());
        return Ok(SearchPlan::default());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取搜索计划: {}", path.display()))?;

    let plan: SearchPlan = toml::from_str(&content)
        .with_context(|| format!("无法解析搜索计划: {}", path.display()))?;

    tracing::info!(
        "已加载搜索计划: 年份 {} | {} 个当事人 | {} 个案号",
        plan.year,
        plan.party_names.len(),
        plan.case_numbers.len()
    );

    Ok(plan)
}

// 年份既可以写成字符串也可以写成整数
fn deserialize_year<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct YearVisitor;

    impl<'de> Visitor<'de> for YearVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or an integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(YearVisitor)
}
