use std::collections::BTreeMap;

/// 从浏览器抓取的会话 Cookie（名称 → 值）
///
/// 有效期由门户端会话决定；门户拒绝请求时需要重新抓取
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    cookies: BTreeMap<String, String>,
}

impl SessionTokens {
    pub fn new(cookies: BTreeMap<String, String>) -> Self {
        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    /// 拼成 `Cookie` 请求头
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SessionTokens {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cookies: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// 验证码挑战：只能用于一次提交
#[derive(Debug)]
pub struct CaptchaChallenge {
    pub image_bytes: Vec<u8>,
    pub issued_for_session: SessionTokens,
}
