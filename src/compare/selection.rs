//! 参与比较的名单选择

use serde::Serialize;
use std::collections::BTreeSet;

/// 用户选择的名单集合，无重复，按名称排序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailingSelection {
    names: BTreeSet<String>,
}

impl MailingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换一个名单的选择状态，返回切换后是否被选中
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.names.remove(name) {
            false
        } else {
            self.names.insert(name.to_string());
            true
        }
    }

    /// 全选；如果可选名单已全部选中则清空
    pub fn toggle_all<S: AsRef<str>>(&mut self, available: &[S]) {
        let all_selected = !available.is_empty()
            && available.iter().all(|name| self.names.contains(name.as_ref()));
        if all_selected {
            self.names.clear();
        } else {
            self.names.extend(available.iter().map(|name| name.as_ref().to_string()));
        }
    }

    pub fn insert<S: Into<String>>(&mut self, name: S) -> bool {
        self.names.insert(name.into())
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 已选名称，按字典序
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for MailingSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { names: iter.into_iter().map(Into::into).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut selection = MailingSelection::new();
        assert!(selection.toggle("Base_SP"));
        assert!(selection.contains("Base_SP"));
        assert!(!selection.toggle("Base_SP"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_all_selects_then_clears() {
        let available = ["b", "a", "c"];
        let mut selection = MailingSelection::new();
        selection.toggle("a");
        selection.toggle_all(&available);
        assert_eq!(selection.names(), ["a", "b", "c"]);
        selection.toggle_all(&available);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_set_semantics() {
        let selection: MailingSelection = ["x", "y", "x"].into_iter().collect();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.names(), ["x", "y"]);
    }
}
