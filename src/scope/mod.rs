//! Selection of a self-contained subset of the API.
//!
//! A [`Scope`] collects the structs, enumerations, callback functions, COM interfaces,
//! functions and constants a caller asks for by native name. Names that do not exist are
//! reported through an [`EventListener`], with a suggestion where an obvious alternative exists
//! (the wide-string variant `NAMEW`, or the enumeration declaring a constant of that name).
//!
//! Once all selections are valid, [`Scope::build_transitive_scope`] computes every type the
//! selection depends on, so bindings generated for it are complete.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdscope::{scope::{Event, Scope}, Metadata};
//! use std::{collections::BTreeSet, path::Path};
//!
//! let metadata = Metadata::load(Path::new("Windows.Win32.winmd"))?;
//!
//! let mut listener = |event: &Event| eprintln!("{event}");
//! let mut scope = Scope::new(&metadata, &mut listener);
//! scope.add_functions(&BTreeSet::from(["GetTickCount64".to_string()]));
//! scope.add_structs(&BTreeSet::from(["RECT".to_string()]));
//! scope.build_transitive_scope()?;
//!
//! for id in scope.transitive_types() {
//!     println!("{}", metadata.get_type(*id).name);
//! }
//! # Ok::<(), winmdscope::Error>(())
//! ```

mod events;

pub use events::{Event, EventListener};

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    metadata::{
        graph::Metadata,
        typesystem::{ConstantId, MethodId, TypeId, TypeKind},
    },
    Error, Result,
};

const NOT_FOUND: &str = "does not exist.";

/// The kinds of elements that can be selected, with the labels used in messages.
#[derive(Debug, Clone, Copy)]
enum Selection {
    Structs,
    Enumerations,
    CallbackFunctions,
    ComInterfaces,
    Functions,
    Constants,
}

impl Selection {
    fn argument(self) -> &'static str {
        match self {
            Selection::Structs => "structs",
            Selection::Enumerations => "enumerations",
            Selection::CallbackFunctions => "callbackFunctions",
            Selection::ComInterfaces => "comInterfaces",
            Selection::Functions => "functions",
            Selection::Constants => "constants",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Selection::Structs => "Struct/union",
            Selection::Enumerations => "Enumeration",
            Selection::CallbackFunctions => "Callback function",
            Selection::ComInterfaces => "COM interface",
            Selection::Functions => "Function",
            Selection::Constants => "Constant",
        }
    }
}

/// A set of selected API elements and, once built, their transitive type closure.
pub struct Scope<'a> {
    metadata: &'a Metadata,
    listener: &'a mut dyn EventListener,
    types: BTreeSet<TypeId>,
    methods: BTreeSet<MethodId>,
    constants: BTreeSet<ConstantId>,
    transitive_types: BTreeSet<TypeId>,
    has_invalid_arguments: bool,
}

impl<'a> Scope<'a> {
    /// An empty scope over `metadata`, reporting to `listener`.
    pub fn new(metadata: &'a Metadata, listener: &'a mut dyn EventListener) -> Scope<'a> {
        Scope {
            metadata,
            listener,
            types: BTreeSet::new(),
            methods: BTreeSet::new(),
            constants: BTreeSet::new(),
            transitive_types: BTreeSet::new(),
            has_invalid_arguments: false,
        }
    }

    /// Select structs and unions. Suggests `NAMEW` for missing names.
    pub fn add_structs(&mut self, names: &BTreeSet<String>) {
        let found = self.metadata.find_structs(names);
        self.add_types(Selection::Structs, names, found, |metadata, name| {
            metadata
                .find_structs(&wide(name))
                .first()
                .map(|id| metadata.get_type(*id).name.clone())
        });
    }

    /// Select enumerations.
    pub fn add_enums(&mut self, names: &BTreeSet<String>) {
        let found = self.metadata.find_enums(names);
        self.add_types(Selection::Enumerations, names, found, |_, _| None);
    }

    /// Select delegates. Suggests `NAMEW` for missing names.
    pub fn add_callback_functions(&mut self, names: &BTreeSet<String>) {
        let found = self.metadata.find_delegates(names);
        self.add_types(Selection::CallbackFunctions, names, found, |metadata, name| {
            metadata
                .find_delegates(&wide(name))
                .first()
                .map(|id| metadata.get_type(*id).name.clone())
        });
    }

    /// Select COM interfaces.
    pub fn add_com_interfaces(&mut self, names: &BTreeSet<String>) {
        let found = self.metadata.find_com_interfaces(names);
        self.add_types(Selection::ComInterfaces, names, found, |_, _| None);
    }

    /// Select functions. Suggests `NAMEW` for missing names.
    ///
    /// Architecture-specific functions are matched by their native name, so a single name
    /// selects all of its variants.
    pub fn add_functions(&mut self, names: &BTreeSet<String>) {
        let metadata = self.metadata;
        let found = metadata.find_functions(names);
        let found_names: BTreeSet<&str> = found
            .iter()
            .map(|id| metadata.get_method(*id).native_name.as_str())
            .collect();

        let missing = missing_names(names, &found_names);
        if missing.is_empty() {
            self.methods.extend(found);
            return;
        }

        for name in missing {
            let suggestion = metadata
                .find_functions(&wide(name))
                .first()
                .map(|id| metadata.get_method(*id).name.clone());
            self.report_missing(Selection::Functions, name, suggestion);
        }
    }

    /// Select constants. For a missing name that is a member of an enumeration, the
    /// enumeration is suggested instead.
    pub fn add_constants(&mut self, names: &BTreeSet<String>) {
        let metadata = self.metadata;
        let found = metadata.find_constants(names);
        let found_names: BTreeSet<&str> = found
            .iter()
            .map(|id| metadata.get_constant(*id).name.as_str())
            .collect();

        let missing = missing_names(names, &found_names);
        if missing.is_empty() {
            self.constants.extend(found);
            return;
        }

        for name in missing {
            let suggestion = metadata
                .find_enum_with_member(name)
                .first()
                .map(|id| metadata.get_type(*id).name.clone());
            self.report_missing(Selection::Constants, name, suggestion);
        }
    }

    /// Compute all types needed by the selection: the selected types, the types referenced by
    /// the selected functions and constants, and everything those reference in turn. Pointers
    /// are followed, but primitives, aliases, pointers and arrays are not part of the result.
    ///
    /// # Errors
    /// Returns [`Error::InvalidScope`] if any selection contained an invalid name.
    pub fn build_transitive_scope(&mut self) -> Result<()> {
        if self.has_invalid_arguments {
            return Err(Error::InvalidScope(
                "the transitive scope cannot be built as invalid arguments were given".to_string(),
            ));
        }

        let metadata = self.metadata;
        let mut scope = self.types.clone();

        let selected: Vec<TypeId> = self.types.iter().copied().collect();
        for id in selected {
            add_dependencies(metadata, &mut scope, metadata.referenced_types(id));
        }
        for id in &self.methods {
            add_dependencies(metadata, &mut scope, metadata.get_method(*id).referenced_types());
        }
        let constant_types = self
            .constants
            .iter()
            .map(|id| metadata.get_constant(*id).ty)
            .collect();
        add_dependencies(metadata, &mut scope, constant_types);

        if self
            .methods
            .iter()
            .any(|id| metadata.get_method(*id).supports_last_error)
        {
            let error_type = &metadata.config().last_error_type;
            match metadata.type_by_name(&error_type.namespace, &error_type.name) {
                Some(id) => {
                    scope.insert(id);
                }
                None => log::warn!("Last-error type {} not found", error_type),
            }
        }

        scope.retain(|id| {
            !matches!(
                metadata.get_type(*id).kind,
                TypeKind::Primitive(_) | TypeKind::Alias(_) | TypeKind::Pointer(_) | TypeKind::Array(_)
            )
        });

        log::debug!(
            "Transitive scope of {} types, {} functions and {} constants has {} types",
            self.types.len(),
            self.methods.len(),
            self.constants.len(),
            scope.len()
        );
        self.transitive_types = scope;
        Ok(())
    }

    /// The selected types.
    #[must_use]
    pub fn types(&self) -> &BTreeSet<TypeId> {
        &self.types
    }

    /// The selected functions.
    #[must_use]
    pub fn methods(&self) -> &BTreeSet<MethodId> {
        &self.methods
    }

    /// The selected constants.
    #[must_use]
    pub fn constants(&self) -> &BTreeSet<ConstantId> {
        &self.constants
    }

    /// The types computed by [`Scope::build_transitive_scope`].
    #[must_use]
    pub fn transitive_types(&self) -> &BTreeSet<TypeId> {
        &self.transitive_types
    }

    /// Selected functions grouped by namespace.
    #[must_use]
    pub fn functions_by_namespace(&self) -> BTreeMap<String, Vec<MethodId>> {
        let mut groups: BTreeMap<String, Vec<MethodId>> = BTreeMap::new();
        for id in &self.methods {
            let namespace = self.metadata.get_method(*id).namespace.clone().unwrap_or_default();
            groups.entry(namespace).or_default().push(*id);
        }
        groups
    }

    /// Selected constants grouped by namespace.
    #[must_use]
    pub fn constants_by_namespace(&self) -> BTreeMap<String, Vec<ConstantId>> {
        let mut groups: BTreeMap<String, Vec<ConstantId>> = BTreeMap::new();
        for id in &self.constants {
            let namespace = self.metadata.get_constant(*id).namespace.clone();
            groups.entry(namespace).or_default().push(*id);
        }
        groups
    }

    /// True if any selection contained a name that does not exist.
    #[must_use]
    pub fn has_invalid_arguments(&self) -> bool {
        self.has_invalid_arguments
    }

    fn add_types<F>(
        &mut self,
        selection: Selection,
        names: &BTreeSet<String>,
        found: Vec<TypeId>,
        suggest: F,
    ) where
        F: Fn(&Metadata, &str) -> Option<String>,
    {
        let metadata = self.metadata;
        let found_names: BTreeSet<&str> = found
            .iter()
            .map(|id| metadata.get_type(*id).native_name.as_str())
            .collect();

        let missing = missing_names(names, &found_names);
        if missing.is_empty() {
            self.types.extend(found);
            return;
        }

        for name in missing {
            let suggestion = suggest(metadata, name);
            self.report_missing(selection, name, suggestion);
        }
    }

    fn report_missing(&mut self, selection: Selection, name: &str, suggestion: Option<String>) {
        self.has_invalid_arguments = true;

        let base = format!("{} \"{}\" {}", selection.label(), name, NOT_FOUND);
        let reason = match (&suggestion, selection) {
            (None, _) => base,
            (Some(enumeration), Selection::Constants) => format!(
                "{base} Enumeration \"{enumeration}\" contains a member with that name. Specify the enumeration instead of the constant."
            ),
            (Some(alternative), _) => format!("{base} Did you mean \"{alternative}\"?."),
        };
        log::warn!("Invalid {}: {}", selection.argument(), reason);

        self.listener.on_event(&Event::InvalidArgument {
            argument: selection.argument().to_string(),
            value: name.to_string(),
            reason,
            suggestion,
        });
    }
}

/// The requested names without a match, sorted.
fn missing_names<'n>(names: &'n BTreeSet<String>, found: &BTreeSet<&str>) -> Vec<&'n str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|name| !found.contains(name))
        .collect()
}

fn wide(name: &str) -> BTreeSet<String> {
    BTreeSet::from([format!("{name}W")])
}

fn add_dependencies(metadata: &Metadata, scope: &mut BTreeSet<TypeId>, types: Vec<TypeId>) {
    let mut pending = types;
    while let Some(id) = pending.pop() {
        // primitives and aliases never extend the scope
        if matches!(
            metadata.get_type(id).kind,
            TypeKind::Primitive(_) | TypeKind::Alias(_)
        ) {
            continue;
        }
        if scope.insert(id) {
            pending.extend(metadata.referenced_types(id));
        }
    }
}
