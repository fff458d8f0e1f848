// ==========================================
// 库存分配引擎 - 缓存键
// ==========================================
// 格式: {kind}::{name1}:{json1}|{name2}:{json2}...
// 参数按名称排序，值按 JSON 序列化，保证同一组参数得到同一个键
// ==========================================

use crate::cache::error::CacheError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 命名空间与参数之间的分隔符
pub const NAMESPACE_SEPARATOR: &str = "::";

// ==========================================
// CacheKind - 缓存命名空间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// 组织结构（花名册 + 门店）
    HierarchicalStructure,
    /// 可选机型列表
    AvailableModels,
    /// 按预约逐台分配结果
    AssignmentCalculation,
    /// 按比例分配结果
    RatioCalculation,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::HierarchicalStructure,
        CacheKind::AvailableModels,
        CacheKind::AssignmentCalculation,
        CacheKind::RatioCalculation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::HierarchicalStructure => "hierarchicalStructure",
            CacheKind::AvailableModels => "availableModels",
            CacheKind::AssignmentCalculation => "assignmentCalculation",
            CacheKind::RatioCalculation => "ratioCalculation",
        }
    }
}

impl AsRef<str> for CacheKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// CacheKey - 组合缓存键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(namespace: impl AsRef<str>) -> Self {
        Self {
            namespace: namespace.as_ref().to_string(),
            params: BTreeMap::new(),
        }
    }

    /// 追加参数（值按 JSON 序列化）
    ///
    /// # 错误
    /// 值无法序列化（例如 map 的键不是字符串）时返回 KeySerialization
    pub fn param<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Result<Self, CacheError> {
        let encoded = serde_json::to_string(value).map_err(|e| CacheError::KeySerialization {
            param: name.to_string(),
            message: e.to_string(),
        })?;
        self.params.insert(name.to_string(), encoded);
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 命名空间前缀（用于按类别清理）
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{}{}", namespace, NAMESPACE_SEPARATOR)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect();
        write!(f, "{}{}{}", self.namespace, NAMESPACE_SEPARATOR, params.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_key_is_independent_of_param_order() {
        let a = CacheKey::new(CacheKind::AssignmentCalculation)
            .param("b", &2)
            .unwrap()
            .param("a", "x")
            .unwrap();
        let b = CacheKey::new(CacheKind::AssignmentCalculation)
            .param("a", "x")
            .unwrap()
            .param("b", &2)
            .unwrap();

        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "assignmentCalculation::a:\"x\"|b:2");
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let a = CacheKey::new(CacheKind::AvailableModels).param("p", &1).unwrap();
        let b = CacheKey::new(CacheKind::RatioCalculation).param("p", &1).unwrap();
        assert_ne!(a.to_string(), b.to_string());
        assert!(a.to_string().starts_with(&CacheKey::namespace_prefix("availableModels")));
    }

    #[test]
    fn test_unserializable_param_is_rejected() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let err = CacheKey::new("custom").param("bad", &bad).unwrap_err();
        assert!(matches!(err, CacheError::KeySerialization { ref param, .. } if param == "bad"));
    }
}
