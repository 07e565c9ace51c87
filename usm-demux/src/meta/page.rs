use super::MetaElement;
use std::collections::HashMap;

/// One row of a metadata table: elements in column order, addressable by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaPage {
    elements: Vec<MetaElement>,
    index: HashMap<String, usize>,
}

impl MetaPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a null element and return its column index.
    ///
    /// When a name repeats, lookups by name keep resolving to the first column.
    pub fn push(&mut self, name: &str) -> usize {
        let column = self.elements.len();
        self.elements.push(MetaElement::new(name));
        self.index.entry(name.to_owned()).or_insert(column);
        column
    }

    pub fn get(&self, name: &str) -> Option<&MetaElement> {
        self.index.get(name).map(|&i| &self.elements[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MetaElement> {
        let i = *self.index.get(name)?;
        self.elements.get_mut(i)
    }

    pub fn column_mut(&mut self, column: usize) -> Option<&mut MetaElement> {
        self.elements.get_mut(column)
    }

    pub fn first(&self) -> Option<&MetaElement> {
        self.elements.first()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetaElement> {
        self.elements.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|x| x.name())
    }
}

impl<'a> IntoIterator for &'a MetaPage {
    type Item = &'a MetaElement;
    type IntoIter = std::slice::Iter<'a, MetaElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MetaPage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.elements.len()))?;
        for element in &self.elements {
            map.serialize_entry(element.name(), element.value())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ElementValue;

    #[test]
    fn test_insertion_order_and_lookup() {
        let mut page = MetaPage::new();
        page.push("filename");
        page.push("stmid");
        page.push("chno");

        assert_eq!(page.names().collect::<Vec<_>>(), ["filename", "stmid", "chno"]);
        assert_eq!(page.first().map(|x| x.name()), Some("filename"));
        assert!(page.get("stmid").unwrap().value().is_null());
        assert!(page.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let mut page = MetaPage::new();
        let first = page.push("dup");
        let second = page.push("dup");

        page.column_mut(first)
            .unwrap()
            .set_value(ElementValue::U8(1));
        page.column_mut(second)
            .unwrap()
            .set_value(ElementValue::U8(2));

        assert_eq!(page.len(), 2);
        assert_eq!(page.get("dup").unwrap().value(), &ElementValue::U8(1));
    }
}
