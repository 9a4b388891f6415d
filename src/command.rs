//! CL command text: escaping, `QCMDEXC` invocation and command builders.
//!
//! Builders only format text. Library, file and object names are passed
//! through as given; the system validates them when the command runs.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// System procedure executing arbitrary CL text.
pub const QCMDEXC: &str = "QSYS.QCMDEXC";

/// Double every single quote so the command fits in a SQL string literal.
pub fn escape(command: &str) -> String {
    command.replace('\'', "''")
}

/// Build the `CALL QSYS.QCMDEXC` statement for a CL command.
///
/// The length argument is the character count of the command *before*
/// escaping, formatted as `DECIMAL(15,5)` to match the procedure signature.
///
/// ```
/// use iseries_rs::command::qcmdexc_call;
///
/// assert_eq!(
///     qcmdexc_call("DLTF FILE(QTEMP/X)"),
///     "CALL QSYS.QCMDEXC('DLTF FILE(QTEMP/X)',0000000018.00000)"
/// );
/// ```
pub fn qcmdexc_call(command: &str) -> String {
    format!(
        "CALL {}('{}',{:010}.00000)",
        QCMDEXC,
        escape(command),
        command.chars().count()
    )
}

/// `SELECT` reading back an outfile written by a CL command.
pub fn outfile_query(output_library: &str, output_table: &str) -> String {
    format!("SELECT * FROM {}.{}", output_library, output_table)
}

/// Display File Description (DSPFD) to an outfile.
///
/// ```text
/// QSYS/DSPFD FILE(MVXBDTA010/*ALL) TYPE(*MBR) OUTPUT(*OUTFILE) FILEATR(*ALL) OUTFILE(QTEMP/JP12345)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFileDescription {
    pub library: String,
    pub output: String,
    pub file_name: String,
    pub file_type: String,
    pub file_attribute: String,
}

impl DisplayFileDescription {
    /// Describe members of all files in `library` into outfile `output`.
    pub fn new(library: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            output: output.into(),
            file_name: "*ALL".to_string(),
            file_type: "*MBR".to_string(),
            file_attribute: "*ALL".to_string(),
        }
    }

    /// Restrict to one file or a generic name (`CUST*`).
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Information type, e.g. `*ACCPTH` or `*BASATR`.
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    /// File attribute filter, e.g. `*PF` or `*LF`.
    pub fn file_attribute(mut self, file_attribute: impl Into<String>) -> Self {
        self.file_attribute = file_attribute.into();
        self
    }

    /// Render the command writing into `output_library`.
    pub fn command(&self, output_library: &str) -> String {
        format!(
            "QSYS/DSPFD FILE({}/{}) TYPE({}) OUTPUT(*OUTFILE) FILEATR({}) OUTFILE({}/{})",
            self.library,
            self.file_name,
            self.file_type,
            self.file_attribute,
            output_library,
            self.output
        )
    }
}

/// Display Object Description (DSPOBJD) to an outfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayObjectDescription {
    pub library: String,
    pub object: String,
    pub object_type: String,
    pub output: String,
    pub output_member: String,
}

impl DisplayObjectDescription {
    pub fn new(
        library: impl Into<String>,
        object: impl Into<String>,
        object_type: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            library: library.into(),
            object: object.into(),
            object_type: object_type.into(),
            output: output.into(),
            output_member: "*REPLACE".to_string(),
        }
    }

    /// `*REPLACE` (default) or `*ADD`.
    pub fn output_member(mut self, output_member: impl Into<String>) -> Self {
        self.output_member = output_member.into();
        self
    }

    pub fn command(&self, output_library: &str) -> String {
        format!(
            "DSPOBJD OBJ({}/{}) OBJTYPE({}) DETAIL(*FULL) OUTPUT(*OUTFILE) OUTFILE({}/{}) OUTMBR(*FIRST {})",
            self.library,
            self.object,
            self.object_type,
            output_library,
            self.output,
            self.output_member
        )
    }
}

/// Display File Field Description (DSPFFD) to an outfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFileFieldDescription {
    pub library: String,
    pub output: String,
    pub file_name: String,
}

impl DisplayFileFieldDescription {
    pub fn new(library: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            output: output.into(),
            file_name: "*ALL".to_string(),
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn command(&self, output_library: &str) -> String {
        format!(
            "QSYS/DSPFFD FILE({}/{}) OUTPUT(*OUTFILE) OUTFILE({}/{})",
            self.library, self.file_name, output_library, self.output
        )
    }
}

/// CPYF `MBROPT` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOption {
    None,
    Add,
    Replace,
    UpdateAdd,
}

impl MemberOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberOption::None => "*NONE",
            MemberOption::Add => "*ADD",
            MemberOption::Replace => "*REPLACE",
            MemberOption::UpdateAdd => "*UPDADD",
        }
    }
}

impl FromStr for MemberOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match special_value(s) {
            "NONE" => Ok(MemberOption::None),
            "ADD" => Ok(MemberOption::Add),
            "REPLACE" => Ok(MemberOption::Replace),
            "UPDADD" => Ok(MemberOption::UpdateAdd),
            _ => Err(Error::validation(format!(
                "option {} for MBROPT is not valid",
                s
            ))),
        }
    }
}

impl fmt::Display for MemberOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPYF `CRTFILE` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFileOption {
    No,
    Yes,
}

impl CreateFileOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateFileOption::No => "*NO",
            CreateFileOption::Yes => "*YES",
        }
    }
}

impl FromStr for CreateFileOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match special_value(s) {
            "NO" => Ok(CreateFileOption::No),
            "YES" => Ok(CreateFileOption::Yes),
            _ => Err(Error::validation(format!(
                "option {} for CRTFILE is not valid",
                s
            ))),
        }
    }
}

impl fmt::Display for CreateFileOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accept a special value with or without its leading `*`.
fn special_value(s: &str) -> &str {
    s.strip_prefix('*').unwrap_or(s)
}

/// Copy File (CPYF) between libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFile {
    pub from_table: String,
    pub from_library: String,
    pub to_table: String,
    pub to_library: String,
    pub member_option: MemberOption,
    pub create_file: CreateFileOption,
}

impl CopyFile {
    pub fn command(&self) -> String {
        format!(
            "CPYF FROMFILE({}/{}) TOFILE({}/{}) MBROPT({}) CRTFILE({}) OUTFMT(*CHAR)",
            self.from_library,
            self.from_table,
            self.to_library,
            self.to_table,
            self.member_option,
            self.create_file
        )
    }
}

/// Change Data Area (CHGDTAARA) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDataArea {
    pub data_area: String,
    pub library: String,
    pub value: String,
}

impl ChangeDataArea {
    pub fn command(&self) -> String {
        format!(
            "CHGDTAARA DTAARA({}/{}) VALUE('{}')",
            self.library, self.data_area, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_doubles_quotes() {
        assert_eq!(escape("O'Brien"), "O''Brien");
        assert_eq!(escape("no quotes"), "no quotes");
        assert_eq!(escape("''"), "''''");
    }

    #[test]
    fn test_qcmdexc_uses_unescaped_length() {
        let cmd = "CHGDTAARA DTAARA(MYLIB/NAME) VALUE('O''Brien')";
        let call = qcmdexc_call("SNDMSG MSG('O'Brien') TOUSR(QSYSOPR)");
        // 36 characters before escaping, 39 after
        assert_eq!(
            call,
            "CALL QSYS.QCMDEXC('SNDMSG MSG(''O''Brien'') TOUSR(QSYSOPR)',0000000036.00000)"
        );
        assert!(qcmdexc_call(cmd).ends_with(&format!(",{:010}.00000)", cmd.chars().count())));
    }

    #[test]
    fn test_qcmdexc_counts_characters_not_bytes() {
        let call = qcmdexc_call("SNDMSG MSG('Miéville')");
        assert!(call.ends_with(",0000000022.00000)"));
    }

    #[test]
    fn test_dspfd_defaults() {
        let cmd = DisplayFileDescription::new("MYLIB", "OUT1").command("QTEMP");
        assert_eq!(
            cmd,
            "QSYS/DSPFD FILE(MYLIB/*ALL) TYPE(*MBR) OUTPUT(*OUTFILE) FILEATR(*ALL) OUTFILE(QTEMP/OUT1)"
        );
    }

    #[test]
    fn test_dspfd_logical_access_paths() {
        let cmd = DisplayFileDescription::new("MVXCDTA400", "LOGICAL")
            .file_type("*ACCPTH")
            .file_attribute("*LF")
            .command("QTEMP");
        assert_eq!(
            cmd,
            "QSYS/DSPFD FILE(MVXCDTA400/*ALL) TYPE(*ACCPTH) OUTPUT(*OUTFILE) FILEATR(*LF) OUTFILE(QTEMP/LOGICAL)"
        );
    }

    #[test]
    fn test_dspobjd() {
        let cmd = DisplayObjectDescription::new("*USRLIBL", "APMNGI04", "*PGM", "OBJS")
            .command("QTEMP");
        assert_eq!(
            cmd,
            "DSPOBJD OBJ(*USRLIBL/APMNGI04) OBJTYPE(*PGM) DETAIL(*FULL) OUTPUT(*OUTFILE) OUTFILE(QTEMP/OBJS) OUTMBR(*FIRST *REPLACE)"
        );
        let cmd = DisplayObjectDescription::new("JPM", "*ALL", "*FILE", "OBJS")
            .output_member("*ADD")
            .command("QTEMP");
        assert!(cmd.ends_with("OUTMBR(*FIRST *ADD)"));
    }

    #[test]
    fn test_dspffd() {
        let cmd = DisplayFileFieldDescription::new("MVXBDTA010", "TEST")
            .file_name("MITMAS*")
            .command("QTEMP");
        assert_eq!(
            cmd,
            "QSYS/DSPFFD FILE(MVXBDTA010/MITMAS*) OUTPUT(*OUTFILE) OUTFILE(QTEMP/TEST)"
        );
    }

    #[test]
    fn test_member_option_parsing() {
        assert_eq!("*REPLACE".parse::<MemberOption>().unwrap(), MemberOption::Replace);
        assert_eq!("UPDADD".parse::<MemberOption>().unwrap(), MemberOption::UpdateAdd);
        assert!(matches!(
            "*APPEND".parse::<MemberOption>(),
            Err(Error::Validation { .. })
        ));
        assert_eq!("*YES".parse::<CreateFileOption>().unwrap(), CreateFileOption::Yes);
        assert!(matches!(
            "*MAYBE".parse::<CreateFileOption>(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_option_parsing_is_exact() {
        for value in ["*replace", "replace", " *ADD ", "**ADD", ""] {
            assert!(
                matches!(value.parse::<MemberOption>(), Err(Error::Validation { .. })),
                "{:?} should be rejected",
                value
            );
        }
        for value in ["*yes", "No", "*YES "] {
            assert!(
                matches!(value.parse::<CreateFileOption>(), Err(Error::Validation { .. })),
                "{:?} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_cpyf() {
        let cmd = CopyFile {
            from_table: "CUSTMAST".to_string(),
            from_library: "PRODLIB".to_string(),
            to_table: "CUSTMAST".to_string(),
            to_library: "TESTLIB".to_string(),
            member_option: MemberOption::Replace,
            create_file: CreateFileOption::Yes,
        }
        .command();
        assert_eq!(
            cmd,
            "CPYF FROMFILE(PRODLIB/CUSTMAST) TOFILE(TESTLIB/CUSTMAST) MBROPT(*REPLACE) CRTFILE(*YES) OUTFMT(*CHAR)"
        );
    }

    #[test]
    fn test_chgdtaara() {
        let cmd = ChangeDataArea {
            data_area: "LASTRUN".to_string(),
            library: "MYLIB".to_string(),
            value: "20231215".to_string(),
        }
        .command();
        assert_eq!(cmd, "CHGDTAARA DTAARA(MYLIB/LASTRUN) VALUE('20231215')");
    }
}
