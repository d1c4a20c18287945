use crate::{
    error::Error,
    query::{Criteria, Query, QueryValue},
};

/// Replaces every `?N` in `template` with the string form of `params[N]`.
///
/// Digits are read greedily, so `?10` is index ten. A `?` without digits is
/// left as is.
pub fn bind_parameters(template: &str, params: &[QueryValue]) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '?' {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some((_, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(*d);
            chars.next();
        }

        if digits.is_empty() {
            out.push('?');
            continue;
        }

        let index = digits.parse::<usize>().unwrap_or(usize::MAX);
        let value = params.get(index).ok_or(Error::ParameterOutOfRange {
            index,
            count: params.len(),
        })?;
        out.push_str(&value.to_string());
    }

    Ok(out)
}

/// A query given as text with positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringQuery {
    template: String,
}

impl StringQuery {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build(&self, params: &[QueryValue]) -> Result<Query, Error> {
        let bound = bind_parameters(&self.template, params)?;
        Ok(Query::new(Criteria::raw(bound)))
    }
}
