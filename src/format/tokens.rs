/// Wang BASIC and BASIC-2 keyword atoms (0x80-0xFB)
///
/// Some atoms are only meaningful as part of a two byte sequence, e.g.
/// `ARCTAN(` is stored as 0xCB 0xCF. 0xFF is the line number marker and
/// never a keyword.

/// Line number marker, followed by two BCD bytes
pub const LINE_NUMBER: u8 = 0xFF;
/// End of line, followed by two zero bytes
pub const END_OF_LINE: u8 = 0x0D;
/// End of block
pub const END_OF_BLOCK: u8 = 0xFD;
/// End of data
pub const END_OF_DATA: u8 = 0xFE;
/// `REM`
pub const REM: u8 = 0xA2;
/// `%` image statement
pub const IMAGE: u8 = 0xD8;

/// First keyword atom
pub const FIRST_TOKEN: u8 = 0x80;

/// Keyword text for atoms 0x80-0xFB, indexed from [`FIRST_TOKEN`]
pub static TOKENS: [&str; 124] = [
    "LIST ", // 0x80
    "CLEAR ", // 0x81
    "RUN ", // 0x82
    "RENUMBER ", // 0x83
    "CONTINUE ", // 0x84
    "SAVE ", // 0x85
    "LIMITS ", // 0x86
    "COPY ", // 0x87
    "KEYIN ", // 0x88
    "DSKIP ", // 0x89
    "AND ", // 0x8A
    "OR ", // 0x8B
    "XOR ", // 0x8C
    "TEMP", // 0x8D
    "DISK ", // 0x8E
    "TAPE ", // 0x8F

    "TRACE ", // 0x90
    "LET ", // 0x91
    "FIX(", // 0x92
    "DIM ", // 0x93
    "ON ", // 0x94
    "STOP ", // 0x95
    "END ", // 0x96
    "DATA ", // 0x97
    "READ ", // 0x98
    "INPUT ", // 0x99
    "GOSUB ", // 0x9A
    "RETURN ", // 0x9B
    "GOTO ", // 0x9C
    "NEXT ", // 0x9D
    "FOR ", // 0x9E
    "IF ", // 0x9F

    "PRINT ", // 0xA0
    "LOAD ", // 0xA1
    "REM ", // 0xA2
    "RESTORE ", // 0xA3
    "PLOT ", // 0xA4
    "SELECT ", // 0xA5
    "COM ", // 0xA6
    "PRINTUSING ", // 0xA7
    "MAT ", // 0xA8
    "REWIND ", // 0xA9
    "SKIP ", // 0xAA
    "BACKSPACE ", // 0xAB
    "SCRATCH ", // 0xAC
    "MOVE ", // 0xAD
    "CONVERT ", // 0xAE
    "PLOT ", // 0xAF SELECT PLOT

    "STEP ", // 0xB0
    "THEN ", // 0xB1
    "TO ", // 0xB2
    "BEG ", // 0xB3
    "OPEN ", // 0xB4
    "CI ", // 0xB5
    "R ", // 0xB6
    "D ", // 0xB7
    "CO ", // 0xB8
    "LGT(", // 0xB9
    "OFF ", // 0xBA
    "DBACKSPACE ", // 0xBB
    "VERIFY ", // 0xBC
    "DA ", // 0xBD
    "BA ", // 0xBE
    "DC ", // 0xBF

    "FN", // 0xC0
    "ABS(", // 0xC1
    "SQR(", // 0xC2
    "COS(", // 0xC3
    "EXP(", // 0xC4
    "INT(", // 0xC5
    "LOG(", // 0xC6
    "SIN(", // 0xC7
    "SGN(", // 0xC8
    "RND(", // 0xC9
    "TAN(", // 0xCA
    "ARC", // 0xCB
    "#PI", // 0xCC
    "TAB(", // 0xCD
    "DEFFN", // 0xCE
    "TAN(", // 0xCF after ARC

    "SIN(", // 0xD0 after ARC
    "COS(", // 0xD1 after ARC
    "HEX(", // 0xD2
    "STR(", // 0xD3
    "ATN(", // 0xD4
    "LEN(", // 0xD5
    "RE", // 0xD6
    "#", // 0xD7
    "%", // 0xD8
    "P", // 0xD9
    "BT", // 0xDA
    "G", // 0xDB
    "VAL(", // 0xDC
    "NUM(", // 0xDD
    "BIN(", // 0xDE
    "POS(", // 0xDF

    "LS=", // 0xE0
    "ALL", // 0xE1
    "PACK", // 0xE2
    "CLOSE", // 0xE3
    "INIT", // 0xE4
    "HEX", // 0xE5 HEXPRINT, not HEX(
    "UNPACK", // 0xE6
    "BOOL", // 0xE7
    "ADD", // 0xE8
    "ROTATE", // 0xE9
    "$", // 0xEA
    "ERROR", // 0xEB
    "ERR", // 0xEC
    "DAC ", // 0xED
    "DSC ", // 0xEE
    "SUB", // 0xEF

    "LINPUT ", // 0xF0
    "VER(", // 0xF1
    " ELSE ", // 0xF2
    "SPACE", // 0xF3
    "ROUND(", // 0xF4
    "AT(", // 0xF5
    "HEXOF(", // 0xF6
    "MAX(", // 0xF7
    "MIN(", // 0xF8
    "MOD(", // 0xF9
    "DATE", // 0xFA
    "TIME", // 0xFB
];

/// Text of a keyword atom, `None` for unassigned codes
pub fn token_text(token: u8) -> Option<&'static str> {
    let index = token.checked_sub(FIRST_TOKEN)?;
    TOKENS.get(index as usize).copied()
}
