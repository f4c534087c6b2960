#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// Cell content for fixture rows
#[derive(Debug, Clone, Copy)]
pub enum C<'a> {
    S(&'a str),
    N(f64),
    Blank,
}

pub const CADASTRO_HEADERS: &[&str] = &[
    "Código",
    "CNPJ",
    "Nome Fantasia",
    "Razão Social",
    "Grupo Econômico",
    "Início de Contrato",
    "Regime Tributário",
    "VL BPO Contábil",
    "Honorário Mensal",
    "Competência Inicial",
    "Sistema Folha",
];

/// Registry rows: two Alfa companies (the first spread over two rows), a
/// row with no key, and a Gama company whose contract date is malformed.
pub fn cadastro_rows() -> Vec<Vec<C<'static>>> {
    use C::*;
    vec![
        vec![
            N(1001.0),
            S("11.222.333/0001-81"),
            S("Alfa"),
            S("Alfa Comércio Ltda"),
            S("Grupo Alfa"),
            S("10/01/2025"),
            S("Lucro Presumido"),
            N(1500.0),
            N(2500.0),
            S("jan-25"),
            Blank,
        ],
        vec![
            Blank,
            S("11222333000181"),
            Blank,
            Blank,
            Blank,
            Blank,
            Blank,
            Blank,
            Blank,
            Blank,
            S("Domínio"),
        ],
        vec![
            N(1002.0),
            S("22.333.444/0001-90"),
            S("Beta"),
            S("Beta Serviços ME"),
            S("Grupo Alfa"),
            S("15/02/2025"),
            S("Simples Nacional"),
            S("R$ 800,00"),
            N(1200.0),
            S("fev-25"),
            S("Questor"),
        ],
        vec![N(1003.0), Blank, Blank, Blank, S("Grupo Beta")],
        vec![
            N(1004.0),
            S("33.444.555/0001-02"),
            S("Gama"),
            S("Gama SA"),
            S("Grupo Gama"),
            S("2025-13-01"),
        ],
    ]
}

/// Write a single-tab workbook with `title_rows` decorative rows, the
/// header at `header_row` (0-based) and data rows right below it.
pub fn write_workbook(
    path: &Path,
    tab: &str,
    header_row: u32,
    headers: &[&str],
    rows: &[Vec<C<'_>>],
) -> PathBuf {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(tab).unwrap();
    if header_row > 0 {
        sheet.write_string(0, 0, "Planilha de Controle").unwrap();
    }
    for (col, label) in headers.iter().enumerate() {
        sheet.write_string(header_row, col as u16, *label).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = header_row + 1 + i as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                C::S(s) => {
                    sheet.write_string(r, col as u16, *s).unwrap();
                }
                C::N(n) => {
                    sheet.write_number(r, col as u16, *n).unwrap();
                }
                C::Blank => {}
            }
        }
    }
    workbook.save(path).unwrap();
    path.to_path_buf()
}

/// Registry workbook as the deployments ship it: tab "Clientes", labels on
/// row 5.
pub fn write_cadastro(path: &Path) -> PathBuf {
    write_workbook(path, "Clientes", 4, CADASTRO_HEADERS, &cadastro_rows())
}
