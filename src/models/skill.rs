/// 技能枚举
///
/// 考试小节按技能划分，与服务端的 skill 字段一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    /// 听力
    Listening,
    /// 阅读
    Reading,
    /// 写作
    Writing,
    /// 口语
    Speaking,
}

impl Skill {
    /// 获取服务端标识
    pub fn key(self) -> &'static str {
        match self {
            Skill::Listening => "listening",
            Skill::Reading => "reading",
            Skill::Writing => "writing",
            Skill::Speaking => "speaking",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Skill::Listening => "听力",
            Skill::Reading => "阅读",
            Skill::Writing => "写作",
            Skill::Speaking => "口语",
        }
    }

    /// 从服务端标识解析技能（精确匹配）
    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "listening" => Some(Skill::Listening),
            "reading" => Some(Skill::Reading),
            "writing" => Some(Skill::Writing),
            "speaking" => Some(Skill::Speaking),
            _ => None,
        }
    }

    /// 智能查找技能（支持大小写和中文名）
    pub fn find(s: &str) -> Option<Self> {
        // 先尝试精确匹配
        if let Some(skill) = Self::from_key(s) {
            return Some(skill);
        }

        let s_lower = s.to_lowercase();
        if s_lower.contains("listen") || s.contains("听") {
            return Some(Skill::Listening);
        }
        if s_lower.contains("read") || s.contains("读") {
            return Some(Skill::Reading);
        }
        if s_lower.contains("writ") || s.contains("写") {
            return Some(Skill::Writing);
        }
        if s_lower.contains("speak") || s.contains("口语") {
            return Some(Skill::Speaking);
        }

        None
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_key_matches_server_values() {
        assert_eq!(Skill::from_key("listening"), Some(Skill::Listening));
        assert_eq!(Skill::from_key("speaking"), Some(Skill::Speaking));
        assert_eq!(Skill::from_key("grammar"), None);
    }

    #[test]
    fn find_accepts_fuzzy_input() {
        assert_eq!(Skill::find("Reading"), Some(Skill::Reading));
        assert_eq!(Skill::find("写作"), Some(Skill::Writing));
        assert_eq!(Skill::find("未知技能"), None);
    }

    #[test]
    fn serde_uses_lowercase_keys() {
        let json = serde_json::to_string(&Skill::Listening).unwrap();
        assert_eq!(json, "\"listening\"");
        let parsed: Skill = serde_json::from_str("\"writing\"").unwrap();
        assert_eq!(parsed, Skill::Writing);
    }
}
