use super::metafile::Attributes;

/// Lazily enumerates the cartesian product of per-key value domains.
///
/// Yields one attribute map per combination, varying the last key fastest.
/// An empty list of domains yields exactly one empty map; any empty domain
/// yields nothing.
#[derive(Debug, Clone)]
pub struct AttributeProduct {
    keys: Vec<String>,
    domains: Vec<Vec<String>>,
    indices: Vec<usize>,
    exhausted: bool,
}

impl AttributeProduct {
    pub fn new<I, V>(domains: I) -> Self
    where
        I: IntoIterator<Item = (String, V)>,
        V: IntoIterator<Item = String>,
    {
        let (keys, domains): (Vec<String>, Vec<Vec<String>>) = domains
            .into_iter()
            .map(|(key, values)| (key, values.into_iter().collect()))
            .unzip();
        let exhausted = domains.iter().any(Vec::is_empty);
        let indices = vec![0; domains.len()];

        Self {
            keys,
            domains,
            indices,
            exhausted,
        }
    }

    /// Total number of combinations, including those already yielded
    pub fn total(&self) -> usize {
        self.domains.iter().map(Vec::len).product()
    }

    fn advance(&mut self) {
        for position in (0..self.indices.len()).rev() {
            self.indices[position] += 1;
            if self.indices[position] < self.domains[position].len() {
                return;
            }
            self.indices[position] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for AttributeProduct {
    type Item = Attributes;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let combination = self
            .keys
            .iter()
            .zip(&self.domains)
            .zip(&self.indices)
            .map(|((key, domain), &index)| (key.clone(), domain[index].clone()))
            .collect();

        self.advance();
        Some(combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(key: &str, values: &[&str]) -> (String, Vec<String>) {
        (
            key.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn test_no_domains_yields_single_empty_combination() {
        let product = AttributeProduct::new(Vec::<(String, Vec<String>)>::new());
        let all: Vec<Attributes> = product.collect();
        assert_eq!(all, vec![Attributes::new()]);
    }

    #[test]
    fn test_empty_domain_yields_nothing() {
        let product = AttributeProduct::new(vec![domain("a", &["1"]), domain("b", &[])]);
        assert_eq!(product.count(), 0);
    }

    #[test]
    fn test_enumerates_every_combination_in_order() {
        let product = AttributeProduct::new(vec![domain("a", &["1", "2"]), domain("b", &["x", "y", "z"])]);
        assert_eq!(product.total(), 6);

        let all: Vec<(String, String)> = product
            .map(|attrs| (attrs["a"].clone(), attrs["b"].clone()))
            .collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], ("1".to_string(), "x".to_string()));
        assert_eq!(all[1], ("1".to_string(), "y".to_string()));
        assert_eq!(all[5], ("2".to_string(), "z".to_string()));
    }
}
