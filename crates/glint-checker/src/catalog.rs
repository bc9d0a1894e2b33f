//! Built-in libraries.
//!
//! | Library | Contents |
//! |---------|----------|
//! | `Core` | `printfn`, `failwith`, `id`, ... and the `List` module |
//! | `System` | `String`, `Int32`, `Math`, `Console`, `Object` |
//! | `System.Text` | `StringBuilder` |
//! | `System.IO` | `File`, `Path` |

use crate::types::{Scheme, Type};
use crate::world::{Entity, EntityKind, Member, MemberKind, Overload, Param};
use std::sync::OnceLock;

/// Names of the libraries the catalog provides.
pub const LIBRARIES: &[&str] = &["Core", "System", "System.Text", "System.IO"];

/// Every built-in entity, tagged with its library.
#[derive(Debug)]
pub(crate) struct Catalog {
    entities: Vec<(&'static str, Entity)>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

/// The shared catalog.
pub(crate) fn get() -> &'static Catalog {
    CATALOG.get_or_init(Catalog::build)
}

impl Catalog {
    fn build() -> Self {
        let mut entities = Vec::new();
        for entity in core() {
            entities.push(("Core", entity));
        }
        for entity in system() {
            entities.push(("System", entity));
        }
        for entity in system_text() {
            entities.push(("System.Text", entity));
        }
        for entity in system_io() {
            entities.push(("System.IO", entity));
        }
        Self { entities }
    }

    pub fn entities(&self) -> impl Iterator<Item = (&'static str, &Entity)> + '_ {
        self.entities.iter().map(|(library, entity)| (*library, entity))
    }

    pub fn has_library(&self, name: &str) -> bool {
        LIBRARIES.contains(&name)
    }

    /// `System.Object`, whose instance members every value has.
    pub fn object(&self) -> Option<&Entity> {
        self.entities
            .iter()
            .map(|(_, entity)| entity)
            .find(|e| e.path == "System.Object")
    }
}

// ===== Construction helpers =====

fn a() -> Type {
    Type::Var(0)
}

fn b() -> Type {
    Type::Var(1)
}

fn p(name: &str, ty: Type) -> Param {
    Param::new(name, ty)
}

fn sig(params: Vec<Param>, ret: Type) -> Overload {
    Overload::new(params, ret)
}

fn value(name: &str, ty: Type, params: &[&str], doc: &str) -> Member {
    Member::new(
        name,
        MemberKind::Value {
            scheme: Scheme::poly(ty),
            params: params.iter().map(|s| (*s).to_string()).collect(),
        },
    )
    .with_doc(doc)
}

fn method(name: &str, overloads: Vec<Overload>) -> Member {
    Member::new(
        name,
        MemberKind::Method {
            is_static: false,
            overloads,
        },
    )
}

fn static_method(name: &str, overloads: Vec<Overload>) -> Member {
    Member::new(
        name,
        MemberKind::Method {
            is_static: true,
            overloads,
        },
    )
}

fn property(name: &str, ty: Type) -> Member {
    Member::new(
        name,
        MemberKind::Property {
            is_static: false,
            ty,
        },
    )
}

fn static_property(name: &str, ty: Type) -> Member {
    Member::new(
        name,
        MemberKind::Property {
            is_static: true,
            ty,
        },
    )
}

fn entity(path: &str, kind: EntityKind, doc: &str, members: Vec<Member>) -> Entity {
    Entity {
        members,
        doc: Some(doc.to_string()),
        ..Entity::new(path, kind)
    }
}

// ===== Libraries =====

fn core() -> Vec<Entity> {
    let string_fn = |ret: Type| Type::fun(Type::string(), ret);
    let mut root = entity(
        "Core",
        EntityKind::Module,
        "Functions available in every file.",
        vec![
            value("printfn", string_fn(Type::unit()), &["format"], "Print formatted text followed by a newline."),
            value("printf", string_fn(Type::unit()), &["format"], "Print formatted text."),
            value("sprintf", string_fn(Type::string()), &["format"], "Format text into a string."),
            value("failwith", string_fn(a()), &["message"], "Raise an exception with the given message."),
            value("failwithf", string_fn(a()), &["format"], "Raise an exception with a formatted message."),
            value("ignore", Type::fun(a(), Type::unit()), &["value"], "Discard a value."),
            value("id", Type::fun(a(), a()), &["x"], "The identity function."),
            value("fst", Type::fun(Type::Tuple(vec![a(), b()]), a()), &["tuple"], "First element of a pair."),
            value("snd", Type::fun(Type::Tuple(vec![a(), b()]), b()), &["tuple"], "Second element of a pair."),
            value("not", Type::fun(Type::bool(), Type::bool()), &["value"], "Boolean negation."),
            value("string", Type::fun(a(), Type::string()), &["value"], "Convert a value to a string."),
            value("int", Type::fun(a(), Type::int()), &["value"], "Convert a value to an integer."),
            value("float", Type::fun(a(), Type::float()), &["value"], "Convert a value to a float."),
        ],
    );
    root.auto_open = true;

    let list = |t: Type| Type::list(t);
    let list_module = entity(
        "List",
        EntityKind::Module,
        "Operations on immutable lists.",
        vec![
            value(
                "map",
                Type::curried([Type::fun(a(), b()), list(a())], list(b())),
                &["mapping", "list"],
                "Apply a function to each element.",
            ),
            value(
                "filter",
                Type::curried([Type::fun(a(), Type::bool()), list(a())], list(a())),
                &["predicate", "list"],
                "Keep the elements satisfying a predicate.",
            ),
            value("length", Type::fun(list(a()), Type::int()), &["list"], "Number of elements."),
            value("head", Type::fun(list(a()), a()), &["list"], "First element."),
            value("sum", Type::fun(list(Type::int()), Type::int()), &["list"], "Sum of the elements."),
            value("isEmpty", Type::fun(list(a()), Type::bool()), &["list"], "Whether the list has no elements."),
            value("rev", Type::fun(list(a()), list(a())), &["list"], "Elements in reverse order."),
        ],
    );

    vec![root, list_module]
}

fn system() -> Vec<Entity> {
    let string = Type::string;
    let int = Type::int;
    let float = Type::float;
    let strings = || Type::array(Type::string());
    let objects = || Type::array(Type::obj());

    let mut namespace = entity("System", EntityKind::Namespace, "Base class library.", Vec::new());
    namespace.auto_open = true;

    let object = entity(
        "System.Object",
        EntityKind::Type,
        "The root of the type hierarchy.",
        vec![
            method("ToString", vec![sig(vec![], string())]),
            method("GetHashCode", vec![sig(vec![], int())]),
            method("Equals", vec![sig(vec![p("obj", Type::obj())], Type::bool())]),
        ],
    );

    let string_type = entity(
        "System.String",
        EntityKind::Type,
        "Immutable UTF-16 text.",
        vec![
            property("Length", int()),
            method(
                "Substring",
                vec![
                    sig(vec![p("startIndex", int())], string()),
                    sig(vec![p("startIndex", int()), p("length", int())], string()),
                ],
            ),
            method("ToUpper", vec![sig(vec![], string())]),
            method("ToLower", vec![sig(vec![], string())]),
            method("Trim", vec![sig(vec![], string())]),
            method("Contains", vec![sig(vec![p("value", string())], Type::bool())]),
            method("StartsWith", vec![sig(vec![p("value", string())], Type::bool())]),
            method("EndsWith", vec![sig(vec![p("value", string())], Type::bool())]),
            method(
                "IndexOf",
                vec![
                    sig(vec![p("value", string())], int()),
                    sig(vec![p("value", Type::char())], int()),
                ],
            ),
            method(
                "Replace",
                vec![sig(vec![p("oldValue", string()), p("newValue", string())], string())],
            ),
            method(
                "Split",
                vec![sig(vec![Param::variadic("separator", Type::array(Type::char()))], strings())],
            ),
            static_method(
                "Concat",
                vec![
                    sig(vec![p("str0", string()), p("str1", string())], string()),
                    sig(vec![p("str0", string()), p("str1", string()), p("str2", string())], string()),
                    sig(
                        vec![
                            p("str0", string()),
                            p("str1", string()),
                            p("str2", string()),
                            p("str3", string()),
                        ],
                        string(),
                    ),
                    sig(vec![Param::variadic("args", objects())], string()),
                ],
            ),
            static_method(
                "Join",
                vec![sig(
                    vec![p("separator", string()), Param::variadic("values", strings())],
                    string(),
                )],
            ),
            static_method("IsNullOrEmpty", vec![sig(vec![p("value", string())], Type::bool())]),
            static_method(
                "Format",
                vec![sig(
                    vec![p("format", string()), Param::variadic("args", objects())],
                    string(),
                )],
            ),
            static_property("Empty", string()),
        ],
    );

    let int32 = entity(
        "System.Int32",
        EntityKind::Type,
        "A 32-bit signed integer.",
        vec![
            static_method("Parse", vec![sig(vec![p("s", string())], int())]),
            static_property("MaxValue", int()),
            static_property("MinValue", int()),
        ],
    );

    let math = entity(
        "System.Math",
        EntityKind::Type,
        "Common mathematical functions.",
        vec![
            static_method(
                "Abs",
                vec![sig(vec![p("value", int())], int()), sig(vec![p("value", float())], float())],
            ),
            static_method(
                "Max",
                vec![
                    sig(vec![p("val1", int()), p("val2", int())], int()),
                    sig(vec![p("val1", float()), p("val2", float())], float()),
                ],
            ),
            static_method(
                "Min",
                vec![
                    sig(vec![p("val1", int()), p("val2", int())], int()),
                    sig(vec![p("val1", float()), p("val2", float())], float()),
                ],
            ),
            static_method("Sqrt", vec![sig(vec![p("d", float())], float())]),
            static_method("Pow", vec![sig(vec![p("x", float()), p("y", float())], float())]),
            static_property("PI", float()),
        ],
    );

    let console = entity(
        "System.Console",
        EntityKind::Type,
        "Standard input and output streams.",
        vec![
            static_method(
                "WriteLine",
                vec![
                    sig(vec![], Type::unit()),
                    sig(vec![p("value", string())], Type::unit()),
                    sig(vec![p("value", int())], Type::unit()),
                    sig(vec![p("value", Type::obj())], Type::unit()),
                    sig(
                        vec![p("format", string()), Param::variadic("arg", objects())],
                        Type::unit(),
                    ),
                ],
            ),
            static_method(
                "Write",
                vec![
                    sig(vec![p("value", string())], Type::unit()),
                    sig(vec![p("value", Type::obj())], Type::unit()),
                ],
            ),
            static_method("ReadLine", vec![sig(vec![], string())]),
        ],
    );

    vec![namespace, object, string_type, int32, math, console]
}

fn system_text() -> Vec<Entity> {
    let builder = || Type::named("System.Text.StringBuilder");
    let namespace = entity("System.Text", EntityKind::Namespace, "Text encoding and building.", Vec::new());

    let mut string_builder = entity(
        "System.Text.StringBuilder",
        EntityKind::Type,
        "A mutable string of characters.",
        vec![
            method(
                "Append",
                vec![
                    sig(vec![p("value", Type::string())], builder()),
                    sig(vec![p("value", Type::char())], builder()),
                    sig(vec![p("value", Type::int())], builder()),
                    sig(vec![p("value", Type::obj())], builder()),
                ],
            ),
            method(
                "AppendLine",
                vec![sig(vec![], builder()), sig(vec![p("value", Type::string())], builder())],
            ),
            method("Clear", vec![sig(vec![], builder())]),
            property("Length", Type::int()),
        ],
    );
    string_builder.constructors = vec![
        sig(vec![], builder()),
        sig(vec![p("value", Type::string())], builder()),
        sig(vec![p("capacity", Type::int())], builder()),
    ];

    vec![namespace, string_builder]
}

fn system_io() -> Vec<Entity> {
    let string = Type::string;
    let namespace = entity("System.IO", EntityKind::Namespace, "Files and paths.", Vec::new());

    let file = entity(
        "System.IO.File",
        EntityKind::Type,
        "Static methods for whole-file operations.",
        vec![
            static_method("ReadAllText", vec![sig(vec![p("path", string())], string())]),
            static_method(
                "ReadAllLines",
                vec![sig(vec![p("path", string())], Type::array(string()))],
            ),
            static_method(
                "WriteAllText",
                vec![sig(vec![p("path", string()), p("contents", string())], Type::unit())],
            ),
            static_method(
                "AppendAllText",
                vec![sig(vec![p("path", string()), p("contents", string())], Type::unit())],
            ),
            static_method("Exists", vec![sig(vec![p("path", string())], Type::bool())]),
        ],
    );

    let path = entity(
        "System.IO.Path",
        EntityKind::Type,
        "Operations on path strings.",
        vec![
            static_method(
                "Combine",
                vec![
                    sig(vec![p("path1", string()), p("path2", string())], string()),
                    sig(
                        vec![p("path1", string()), p("path2", string()), p("path3", string())],
                        string(),
                    ),
                    sig(vec![Param::variadic("paths", Type::array(string()))], string()),
                ],
            ),
            static_method("GetFileName", vec![sig(vec![p("path", string())], string())]),
            static_method(
                "GetFileNameWithoutExtension",
                vec![sig(vec![p("path", string())], string())],
            ),
            static_method("GetExtension", vec![sig(vec![p("path", string())], string())]),
            static_method("GetDirectoryName", vec![sig(vec![p("path", string())], string())]),
        ],
    );

    vec![namespace, file, path]
}
