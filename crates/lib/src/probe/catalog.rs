//! The fixed set of optional native modules the embedded interpreter may carry.

/// One set of source files that together implement a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCandidate {
  /// Paths relative to the interpreter's `Modules/` directory.
  pub files: &'static [&'static str],
}

/// Static description of an optional module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalModule {
  pub name: &'static str,
  pub feature_flag: &'static str,
  pub init_symbol: &'static str,
  /// Tried in order; older source trees use different file names.
  pub candidates: &'static [SourceCandidate],
}

pub const OPTIONAL_MODULES: &[OptionalModule] = &[
  OptionalModule {
    name: "_struct",
    feature_flag: "HAVE_STRUCT_MODULE",
    init_symbol: "PyInit__struct",
    candidates: &[
      SourceCandidate { files: &["_struct.c"] },
      SourceCandidate {
        files: &["structmodule.c"],
      },
    ],
  },
  OptionalModule {
    name: "_multiprocessing",
    feature_flag: "HAVE_MULTIPROCESSING",
    init_symbol: "PyInit__multiprocessing",
    candidates: &[SourceCandidate {
      files: &["_multiprocessing/multiprocessing.c", "_multiprocessing/semaphore.c"],
    }],
  },
  OptionalModule {
    name: "_posixsubprocess",
    feature_flag: "HAVE_POSIXSUBPROCESS",
    init_symbol: "PyInit__posixsubprocess",
    candidates: &[SourceCandidate {
      files: &["_posixsubprocess.c"],
    }],
  },
  OptionalModule {
    name: "select",
    feature_flag: "HAVE_SELECT",
    init_symbol: "PyInit_select",
    candidates: &[SourceCandidate {
      files: &["selectmodule.c"],
    }],
  },
];
