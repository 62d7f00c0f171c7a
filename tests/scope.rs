mod common;

use std::collections::BTreeSet;

use common::{foundation, Attr, Field, Function, Sig, StructOptions, Value, WinmdWriter, ARM64, FOUNDATION, X64};
use winmdscope::{
    scope::{Event, Scope},
    Error, LoaderConfig, Metadata,
};

const GDI: &str = "Windows.Win32.Graphics.Gdi";
const UI: &str = "Windows.Win32.UI.WindowsAndMessaging";
const COM: &str = "Windows.Win32.System.Com";
const DEBUG: &str = "Windows.Win32.System.Diagnostics.Debug";

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn no_events(event: &Event) {
    panic!("unexpected {event}");
}

fn type_names(metadata: &Metadata, ids: &BTreeSet<winmdscope::metadata::typesystem::TypeId>) -> BTreeSet<String> {
    ids.iter().map(|id| metadata.get_type(*id).name.clone()).collect()
}

fn api() -> Metadata {
    let mut writer = WinmdWriter::new();
    foundation(&mut writer);

    writer.add_simple_struct(
        GDI,
        "LOGFONTW",
        &[("lfHeight", Sig::I4), ("lfFaceName", Sig::array(Sig::Char, 32))],
    );
    writer.add_simple_struct(
        UI,
        "WINDOWPLACEMENT",
        &[
            ("length", Sig::U4),
            ("ptMinPosition", Sig::named(FOUNDATION, "POINT")),
            ("rcNormalPosition", Sig::named(FOUNDATION, "RECT")),
        ],
    );
    writer.add_enum(
        UI,
        "MESSAGEBOX_STYLE",
        Sig::U4,
        &[("MB_OK", Value::U4(0)), ("MB_OKCANCEL", Value::U4(1))],
        true,
    );
    writer.add_delegate(
        UI,
        "WNDENUMPROC",
        Function::new(
            "Invoke",
            Sig::named(FOUNDATION, "BOOL"),
            &[("hwnd", Sig::IntPtr), ("placement", Sig::ptr(Sig::named(UI, "WINDOWPLACEMENT")))],
        ),
        Vec::new(),
    );
    writer.add_apis(
        UI,
        vec![
            Function::new(
                "MessageBoxW",
                Sig::I4,
                &[
                    ("lpText", Sig::named(FOUNDATION, "PWSTR")),
                    ("uType", Sig::named(UI, "MESSAGEBOX_STYLE")),
                ],
            )
            .import("USER32.dll", true),
            Function::new("EnumWindows", Sig::named(FOUNDATION, "BOOL"), &[("lpEnumFunc", Sig::named(UI, "WNDENUMPROC"))])
                .import("USER32.dll", false),
        ],
        vec![Field::constant("WM_USER", Sig::U4, Value::U4(0x400))],
    );

    writer.add_interface(
        COM,
        "IUnknown",
        None,
        vec![Function::new("AddRef", Sig::U4, &[])],
        vec![Attr::Guid(0, 0, 0, [0xC0, 0, 0, 0, 0, 0, 0, 0x46])],
    );
    writer.add_interface(
        COM,
        "IPersist",
        Some(common::Target::Named(COM.to_string(), "IUnknown".to_string())),
        vec![Function::new("GetClassID", Sig::I4, &[("pClassID", Sig::ptr(Sig::guid()))])],
        vec![Attr::Guid(0x0000_010c, 0, 0, [0xC0, 0, 0, 0, 0, 0, 0, 0x46])],
    );

    for (architecture, field) in [(X64, "Rip"), (ARM64, "Pc")] {
        writer.add_struct(
            DEBUG,
            "CONTEXT",
            vec![Field::new(field, Sig::U8)],
            StructOptions {
                attrs: vec![Attr::Architecture(architecture)],
                ..StructOptions::default()
            },
        );
    }
    writer.add_apis(
        DEBUG,
        [X64, ARM64]
            .into_iter()
            .map(|architecture| {
                Function::new(
                    "RtlCaptureContext",
                    Sig::Void,
                    &[("ContextRecord", Sig::ptr(Sig::named(DEBUG, "CONTEXT")))],
                )
                .import("KERNEL32.dll", false)
                .with(Attr::Architecture(architecture))
            })
            .collect(),
        Vec::new(),
    );

    writer.load(LoaderConfig::default()).unwrap()
}

#[test]
fn struct_closure() {
    let metadata = api();
    let mut listener = no_events;
    let mut scope = Scope::new(&metadata, &mut listener);

    scope.add_structs(&names(&["WINDOWPLACEMENT"]));
    scope.build_transitive_scope().unwrap();

    assert_eq!(scope.types().len(), 1);
    assert_eq!(
        type_names(&metadata, scope.transitive_types()),
        names(&["WINDOWPLACEMENT", "POINT", "RECT"])
    );
}

#[test]
fn function_closure() {
    let metadata = api();
    let mut listener = no_events;
    let mut scope = Scope::new(&metadata, &mut listener);

    scope.add_functions(&names(&["EnumWindows"]));
    scope.build_transitive_scope().unwrap();

    // aliases, pointers and primitives stay out, the delegate pulls in its signature types
    assert_eq!(
        type_names(&metadata, scope.transitive_types()),
        names(&["WNDENUMPROC", "WINDOWPLACEMENT", "POINT", "RECT"])
    );
}

#[test]
fn last_error_type_is_added() {
    let metadata = api();
    let mut listener = no_events;
    let mut scope = Scope::new(&metadata, &mut listener);

    scope.add_functions(&names(&["CloseHandle", "MessageBoxW"]));
    scope.build_transitive_scope().unwrap();

    assert_eq!(
        type_names(&metadata, scope.transitive_types()),
        names(&["MESSAGEBOX_STYLE", "WIN32_ERROR"])
    );

    let groups = scope.functions_by_namespace();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[FOUNDATION].len(), 1);
    assert_eq!(groups[UI].len(), 1);
}

#[test]
fn variants_are_selected_by_native_name() {
    let metadata = api();
    let mut listener = no_events;
    let mut scope = Scope::new(&metadata, &mut listener);

    scope.add_functions(&names(&["RtlCaptureContext"]));
    scope.add_structs(&names(&["CONTEXT"]));
    scope.build_transitive_scope().unwrap();

    let selected: BTreeSet<String> = scope
        .methods()
        .iter()
        .map(|id| metadata.get_method(*id).name.clone())
        .collect();
    assert_eq!(selected, names(&["RtlCaptureContext_ARM64", "RtlCaptureContext_X64"]));
    assert_eq!(scope.types().len(), 2);
    assert_eq!(
        type_names(&metadata, scope.transitive_types()),
        names(&["CONTEXT_ARM64", "CONTEXT_X64"])
    );
}

#[test]
fn interfaces_and_constants() {
    let metadata = api();
    let mut listener = no_events;
    let mut scope = Scope::new(&metadata, &mut listener);

    scope.add_com_interfaces(&names(&["IPersist"]));
    scope.add_constants(&names(&["WM_USER", "MAX_PATH"]));
    scope.add_enums(&names(&["MESSAGEBOX_STYLE"]));
    scope.build_transitive_scope().unwrap();

    assert_eq!(
        type_names(&metadata, scope.transitive_types()),
        names(&["IPersist", "IUnknown", "Guid", "MESSAGEBOX_STYLE"])
    );

    let constants = scope.constants_by_namespace();
    assert_eq!(constants.len(), 2);
    let wm_user = metadata.get_constant(constants[UI][0]);
    assert_eq!(wm_user.name, "WM_USER");
}

#[test]
fn invalid_names_are_reported() {
    let metadata = api();
    let mut events = Vec::new();
    {
        let mut listener = |event: &Event| events.push(event.clone());
        let mut scope = Scope::new(&metadata, &mut listener);

        scope.add_structs(&names(&["LOGFONT", "RECT"]));
        scope.add_functions(&names(&["MessageBox"]));
        scope.add_constants(&names(&["MB_OK"]));
        scope.add_callback_functions(&names(&["RECT"]));
        scope.add_com_interfaces(&names(&["IStream"]));
        scope.add_enums(&names(&["WINDOWPLACEMENT"]));

        assert!(scope.has_invalid_arguments());
        // a selection with an invalid name adds nothing
        assert!(scope.types().is_empty());
        assert!(matches!(
            scope.build_transitive_scope(),
            Err(Error::InvalidScope(_))
        ));
    }

    assert_eq!(events.len(), 6);
    let suggestions: Vec<(String, String, Option<String>)> = events
        .iter()
        .map(|event| match event {
            Event::InvalidArgument {
                argument,
                value,
                suggestion,
                ..
            } => (argument.clone(), value.clone(), suggestion.clone()),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(
        suggestions,
        vec![
            ("structs".to_string(), "LOGFONT".to_string(), Some("LOGFONTW".to_string())),
            ("functions".to_string(), "MessageBox".to_string(), Some("MessageBoxW".to_string())),
            ("constants".to_string(), "MB_OK".to_string(), Some("MESSAGEBOX_STYLE".to_string())),
            ("callbackFunctions".to_string(), "RECT".to_string(), None),
            ("comInterfaces".to_string(), "IStream".to_string(), None),
            ("enumerations".to_string(), "WINDOWPLACEMENT".to_string(), None),
        ]
    );

    assert_eq!(
        events[0].to_string(),
        "invalid value for 'structs': Struct/union \"LOGFONT\" does not exist. Did you mean \"LOGFONTW\"?."
    );
    assert_eq!(
        events[2].to_string(),
        "invalid value for 'constants': Constant \"MB_OK\" does not exist. Enumeration \"MESSAGEBOX_STYLE\" contains a member with that name. Specify the enumeration instead of the constant."
    );
}
