//! Jeu de caractères des attributs DBF (`.cpg` ou octet LDID de l'en-tête)

use std::io::{self, Read, Seek, SeekFrom};

use dbase::encoding::LossyCodePage;
use dbase::yore::code_pages;
use dbase::CodePageMark;

/// Position de l'octet "language driver" dans l'en-tête DBF
pub(crate) const LDID_OFFSET: u64 = 29;

/// Page de code des champs texte: le `.cpg` prime sur l'octet LDID.
/// Sans l'un ni l'autre, Latin-1 (CP1252).
pub fn resolve(cpg: Option<&str>, ldid: u8) -> CodePageMark {
    cpg.and_then(from_cpg)
        .or_else(|| from_ldid(ldid))
        .unwrap_or(CodePageMark::CP1252)
}

/// Interprète le contenu d'un fichier `.cpg`
///
/// Formes reconnues: numéro seul (`1252`, `65001`), préfixé (`ANSI 1251`,
/// `CP850`, `windows-1250`), ISO (`8859_1`, `ISO-8859-1`) et quelques noms
/// usuels (`UTF-8`, `latin1`, `Big5`).
pub fn from_cpg(content: &str) -> Option<CodePageMark> {
    let label = content.trim().to_ascii_uppercase().replace('_', "-");
    let label = ["ANSI ", "WINDOWS-", "CP", "IBM"]
        .iter()
        .find_map(|prefix| label.strip_prefix(prefix))
        .unwrap_or(&label)
        .trim();

    if let Ok(code_page) = label.parse::<u32>() {
        return code_page_mark(code_page);
    }

    match label {
        "UTF-8" | "UTF8" => Some(CodePageMark::Utf8),
        "8859-1" | "ISO-8859-1" | "ISO8859-1" | "8859-15" | "ISO-8859-15" | "LATIN1" => {
            Some(CodePageMark::CP1252)
        }
        "SHIFT-JIS" | "SJIS" => Some(CodePageMark::CP932),
        "GBK" | "GB2312" => Some(CodePageMark::CP936),
        "EUC-KR" => Some(CodePageMark::CP949),
        "BIG5" => Some(CodePageMark::CP950),
        _ => None,
    }
}

fn code_page_mark(code_page: u32) -> Option<CodePageMark> {
    let mark = match code_page {
        437 => CodePageMark::CP437,
        850 => CodePageMark::CP850,
        852 => CodePageMark::CP852,
        861 => CodePageMark::CP861,
        865 => CodePageMark::CP865,
        866 => CodePageMark::CP866,
        874 => CodePageMark::CP874,
        932 => CodePageMark::CP932,
        936 => CodePageMark::CP936,
        949 => CodePageMark::CP949,
        950 => CodePageMark::CP950,
        1250 => CodePageMark::CP1250,
        1251 => CodePageMark::CP1251,
        1252 | 28591 => CodePageMark::CP1252,
        1253 => CodePageMark::CP1253,
        1254 => CodePageMark::CP1254,
        1255 => CodePageMark::CP1255,
        1256 => CodePageMark::CP1256,
        65001 => CodePageMark::Utf8,
        _ => return None,
    };
    Some(mark)
}

/// Interprète l'octet LDID. `0x57` est la valeur "ANSI" écrite par ArcGIS.
pub fn from_ldid(ldid: u8) -> Option<CodePageMark> {
    match ldid {
        0x57 => Some(CodePageMark::CP1252),
        _ => match CodePageMark::from(ldid) {
            CodePageMark::Undefined | CodePageMark::Invalid => None,
            mark => Some(mark),
        },
    }
}

/// Règle le décodage texte du lecteur DBF.
///
/// Retourne `false` si la page de code n'a pas de table de conversion:
/// le texte est alors lu comme de l'UTF-8 avec remplacement.
pub(crate) fn apply<T: Read + Seek>(reader: &mut dbase::Reader<T>, mark: CodePageMark) -> bool {
    match mark {
        CodePageMark::CP437 => reader.set_encoding(LossyCodePage(code_pages::CP437)),
        CodePageMark::CP850 => reader.set_encoding(LossyCodePage(code_pages::CP850)),
        CodePageMark::CP852 => reader.set_encoding(LossyCodePage(code_pages::CP852)),
        CodePageMark::CP861 => reader.set_encoding(LossyCodePage(code_pages::CP861)),
        CodePageMark::CP865 => reader.set_encoding(LossyCodePage(code_pages::CP865)),
        CodePageMark::CP866 => reader.set_encoding(LossyCodePage(code_pages::CP866)),
        CodePageMark::CP874 => reader.set_encoding(LossyCodePage(code_pages::CP874)),
        CodePageMark::CP1250 => reader.set_encoding(LossyCodePage(code_pages::CP1250)),
        CodePageMark::CP1251 => reader.set_encoding(LossyCodePage(code_pages::CP1251)),
        CodePageMark::CP1252 => reader.set_encoding(LossyCodePage(code_pages::CP1252)),
        CodePageMark::CP1253 => reader.set_encoding(LossyCodePage(code_pages::CP1253)),
        CodePageMark::CP1254 => reader.set_encoding(LossyCodePage(code_pages::CP1254)),
        CodePageMark::CP1255 => reader.set_encoding(LossyCodePage(code_pages::CP1255)),
        CodePageMark::CP1256 => reader.set_encoding(LossyCodePage(code_pages::CP1256)),
        CodePageMark::Utf8 => reader.set_encoding(dbase::UnicodeLossy),
        _ => {
            reader.set_encoding(dbase::UnicodeLossy);
            return false;
        }
    }
    true
}

/// Source DBF dont l'octet LDID est lu comme nul.
///
/// Le lecteur dBase refuse d'ouvrir les fichiers dont il ne connaît pas la
/// page de code (CJK notamment). La page est choisie par `resolve` puis `apply`.
pub(crate) struct MaskedLdid<R> {
    inner: R,
    position: u64,
}

impl<R> MaskedLdid<R> {
    /// `inner` doit être positionné au début du fichier
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }
}

impl<R: Read> Read for MaskedLdid<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let start = self.position;
        self.position += n as u64;
        if start <= LDID_OFFSET && LDID_OFFSET < self.position {
            buf[(LDID_OFFSET - start) as usize] = 0;
        }
        Ok(n)
    }
}

impl<R: Seek> Seek for MaskedLdid<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_cpg() {
        assert!(matches!(from_cpg("UTF-8\n"), Some(CodePageMark::Utf8)));
        assert!(matches!(from_cpg("65001"), Some(CodePageMark::Utf8)));
        assert!(matches!(from_cpg("1252"), Some(CodePageMark::CP1252)));
        assert!(matches!(from_cpg("ISO-8859-1"), Some(CodePageMark::CP1252)));
        assert!(matches!(from_cpg("8859_1"), Some(CodePageMark::CP1252)));
        assert!(matches!(from_cpg("ANSI 1251"), Some(CodePageMark::CP1251)));
        assert!(matches!(from_cpg("windows-1250"), Some(CodePageMark::CP1250)));
        assert!(matches!(from_cpg("CP850"), Some(CodePageMark::CP850)));
        assert!(matches!(from_cpg("88591"), None));
        assert!(matches!(from_cpg("  "), None));
    }

    #[test]
    fn test_from_ldid() {
        assert!(matches!(from_ldid(0x03), Some(CodePageMark::CP1252)));
        assert!(matches!(from_ldid(0x57), Some(CodePageMark::CP1252)));
        assert!(matches!(from_ldid(0xC9), Some(CodePageMark::CP1251)));
        assert!(matches!(from_ldid(0xF0), Some(CodePageMark::Utf8)));
        assert!(matches!(from_ldid(0x00), None));
    }

    #[test]
    fn test_resolve_prefers_cpg() {
        assert!(matches!(resolve(Some("UTF-8"), 0x03), CodePageMark::Utf8));
        assert!(matches!(resolve(Some("garbage"), 0xF0), CodePageMark::Utf8));
        assert!(matches!(resolve(None, 0x00), CodePageMark::CP1252));
    }

    #[test]
    fn test_masked_ldid() {
        let mut header = vec![0x03u8; 40];
        header[29] = 0x7A;

        let mut source = MaskedLdid::new(Cursor::new(header));
        let mut head = [0u8; 16];
        source.read_exact(&mut head).unwrap();
        let mut rest = Vec::new();
        source.read_to_end(&mut rest).unwrap();
        assert_eq!(rest[29 - 16], 0);
        assert_eq!(rest[28 - 16], 0x03);

        source.seek(SeekFrom::Start(29)).unwrap();
        let mut byte = [0xFFu8; 1];
        source.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 0);
    }
}
