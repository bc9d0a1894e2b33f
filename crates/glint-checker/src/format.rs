//! Typing of printf-style format strings.

use crate::types::{Type, TypeStore};

/// Functions whose first argument is a format string.
pub(crate) const FORMAT_FUNCTIONS: &[&str] = &["printf", "printfn", "sprintf", "failwithf"];

/// A placeholder the format string does not understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BadSpecifier {
    /// Byte offset of the `%` inside the literal's contents.
    pub offset: usize,
    pub specifier: char,
}

/// Argument types demanded by `format`, in order.
///
/// `%s %d %i %f %b %c` are typed; `%A` and `%O` accept anything. Flags and
/// widths between `%` and the conversion character are skipped.
pub(crate) fn format_arguments(
    format: &str,
    store: &mut TypeStore,
) -> Result<Vec<Type>, BadSpecifier> {
    let mut args = Vec::new();
    let mut chars = format.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            continue;
        }
        // Flags and width.
        while chars
            .peek()
            .is_some_and(|(_, c)| matches!(c, '-' | '+' | ' ' | '0'..='9' | '.'))
        {
            chars.next();
        }
        let Some((_, spec)) = chars.next() else {
            return Err(BadSpecifier {
                offset,
                specifier: '%',
            });
        };
        let ty = match spec {
            '%' => continue,
            's' => Type::string(),
            'd' | 'i' => Type::int(),
            'f' | 'g' | 'e' => Type::float(),
            'b' => Type::bool(),
            'c' => Type::char(),
            'A' | 'O' => store.fresh(),
            other => {
                return Err(BadSpecifier {
                    offset,
                    specifier: other,
                })
            }
        };
        args.push(ty);
    }
    Ok(args)
}

/// Type of `function format` once the format is known.
pub(crate) fn format_function_type(function: &str, args: Vec<Type>, store: &mut TypeStore) -> Type {
    let ret = match function {
        "sprintf" => Type::string(),
        "failwithf" => store.fresh(),
        _ => Type::unit(),
    };
    Type::curried(args, ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: &str) -> Vec<String> {
        let mut store = TypeStore::new();
        format_arguments(format, &mut store)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_format_arguments() {
        assert_eq!(render("%s is %d years"), vec!["string", "int"]);
        assert_eq!(render("100%% %5.2f %-3i %b %c"), vec!["float", "int", "bool", "char"]);
        assert_eq!(render("plain"), Vec::<String>::new());
        assert_eq!(render("%A"), vec!["'a"]);
    }

    #[test]
    fn test_bad_specifier() {
        let mut store = TypeStore::new();
        let err = format_arguments("ok %q", &mut store).unwrap_err();
        assert_eq!(err, BadSpecifier { offset: 3, specifier: 'q' });
        let err = format_arguments("trailing %", &mut store).unwrap_err();
        assert_eq!(err.specifier, '%');
    }

    #[test]
    fn test_function_types() {
        let mut store = TypeStore::new();
        let printfn = format_function_type("printfn", vec![Type::string()], &mut store);
        assert_eq!(printfn.to_string(), "string -> unit");
        let sprintf = format_function_type("sprintf", vec![Type::int()], &mut store);
        assert_eq!(sprintf.to_string(), "int -> string");
        let bare = format_function_type("printf", Vec::new(), &mut store);
        assert_eq!(bare.to_string(), "unit");
    }
}
