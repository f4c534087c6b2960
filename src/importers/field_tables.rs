//! Header spellings of the shared workbooks.
//!
//! Order matters: a header goes to the first field with a matching variant,
//! so specific labels ("VL BPO Contábil") are listed before the generic
//! ones they contain ("BPO Contábil"). A variant starting with `=` must match
//! the whole header.

use crate::db::SourceKind;

use super::column_mapper::FieldTable;

type Table = &'static [(&'static str, &'static [&'static str])];

pub const CADASTRO_FIELDS: Table = &[
    ("cnpj", &["cnpj"]),
    ("nome_fantasia", &["nome fantasia", "fantasia"]),
    ("razao_social", &["razao social"]),
    ("inicio_contrato", &["inicio de contrato", "inicio do contrato", "inicio contrato"]),
    ("termino_contrato", &["termino de contrato", "termino do contrato", "termino contrato"]),
    ("ie", &["inscricao estadual", "=ie", "=i.e."]),
    ("link_do_site", &["site"]),
    ("municipio_uf", &["municipio"]),
    ("endereco", &["endereco"]),
    ("uf", &["=uf"]),
    ("estado", &["=estado"]),
    ("observacoes_cadastro", &["observacoes", "obs cadastro"]),
    ("setor", &["=setor"]),
    ("segmento", &["segmento"]),
    ("atividade_especialidade", &["atividade", "especialidade"]),
    ("faturamento_anual", &["faturamento"]),
    ("porte", &["=porte"]),
    ("regime_tributario_proposta", &["regime tributario proposta", "regime proposta"]),
    ("regime_tributario_atual", &["regime tributario", "=regime"]),
    ("deadline_dia", &["deadline dia", "=deadline"]),
    ("deadline_periodicidade", &["periodicidade"]),
    ("deadline_util_corrente", &["util ou corrente", "util corrente"]),
    ("centro_custo_quantidade", &["qtd centro de custo", "quantidade centro de custo"]),
    ("centro_custo_possui", &["centro de custo"]),
    ("departamentalizacao_quantidade", &["qtd departamentalizacao", "quantidade departamentalizacao"]),
    ("departamentalizacao_possui", &["departamentalizacao"]),
    ("scp_quantidade", &["scp"]),
    ("importacao_processos_ano", &["importacao"]),
    ("exportacao_processos_ano", &["exportacao"]),
    ("nf_servicos_prestados", &["servicos prestados"]),
    ("servicos_tomados", &["servicos tomados"]),
    ("nf_entradas", &["nf entrada", "notas de entrada"]),
    ("nf_saidas", &["nf saida", "notas de saida"]),
    ("ctes_entrada", &["cte entrada", "ctes entrada", "ct-e entrada"]),
    ("ctes_saida", &["cte saida", "ctes saida", "ct-e saida"]),
    ("cupom_fiscal", &["cupom"]),
    ("nf_pjs", &["nf pj", "pjs"]),
    ("pro_labore", &["pro labore", "pro-labore", "prolabore"]),
    ("estagiarios", &["estagiario"]),
    ("aprendizes", &["aprendiz"]),
    ("rpa", &["=rpa"]),
    ("domesticas_clt", &["domestica"]),
    ("total_colaboradores", &["total de colaboradores", "total colaboradores"]),
    ("colab_clt", &["colaboradores clt", "colab clt", "=clt"]),
    ("data_adiantamento", &["adiantamento"]),
    ("data_pagamento", &["data de pagamento", "data pagamento"]),
    ("sistema_contabil", &["sistema contabil"]),
    ("sistema_fiscal", &["sistema fiscal"]),
    ("sistema_folha", &["sistema folha", "sistema de folha"]),
    ("sistema_financeiro", &["sistema financeiro"]),
    ("sistema_rh", &["sistema rh", "sistema de rh"]),
    ("sistema_outros", &["sistema outros", "outros sistemas"]),
    ("empresa_aberta_go", &["aberta go", "aberta em go"]),
    ("contato_principal_cargo", &["cargo"]),
    ("contato_principal_email", &["e-mail", "email"]),
    ("contato_principal_celular", &["celular", "telefone"]),
    ("contato_principal_nome", &["contato principal", "nome do contato", "=contato"]),
    ("plano_contratado", &["plano"]),
    ("sla", &["=sla", "sla contratado"]),
    // amounts before the service flags they contain
    ("vl_bpo_contabil", &["vl bpo contabil", "valor bpo contabil"]),
    ("vl_bpo_fiscal", &["vl bpo fiscal", "valor bpo fiscal"]),
    ("vl_bpo_folha", &["vl bpo folha", "valor bpo folha"]),
    ("vl_bpo_financeiro", &["vl bpo financeiro", "valor bpo financeiro"]),
    ("vl_bpo_rh", &["vl bpo rh", "valor bpo rh"]),
    ("vl_bpo_legal", &["vl bpo legal", "valor bpo legal"]),
    ("bpo_contabil_faturado", &["bpo contabil faturado"]),
    ("bpo_fiscal_faturado", &["bpo fiscal faturado"]),
    ("bpo_folha_faturado", &["bpo folha faturado"]),
    ("bpo_financeiro_faturado", &["bpo financeiro faturado"]),
    ("bpo_rh_faturado", &["bpo rh faturado"]),
    ("bpo_legal_faturado", &["bpo legal faturado"]),
    ("bpo_contabil", &["bpo contabil"]),
    ("bpo_fiscal", &["bpo fiscal"]),
    ("bpo_folha", &["bpo folha"]),
    ("bpo_financeiro", &["bpo financeiro"]),
    ("bpo_rh", &["bpo rh"]),
    ("bpo_cnd", &["bpo cnd", "=cnd"]),
    ("honorario_mensal_total", &["honorario"]),
    ("competencia_inicial_fixo", &["competencia inicial fixo", "competencia inicial"]),
    ("competencia_diversos_inicial", &["competencia diversos"]),
    ("vl_diversos_inicial", &["vl diversos", "valor diversos"]),
    ("diversos_in_faturado", &["diversos in faturado", "diversos faturado"]),
    ("diversos_inicial", &["diversos inicial", "=diversos"]),
    ("implantacao_faturado", &["implantacao faturado"]),
    ("vencimento_implantacao", &["vencimento implantacao", "vencimento da implantacao"]),
    ("vl_implantacao", &["vl implantacao", "valor implantacao", "valor da implantacao"]),
    ("implantacao", &["implantacao"]),
    ("forma_pgto", &["forma de pagamento", "forma pgto", "forma de pgto"]),
    ("observacao_closer", &["observacao closer", "obs closer"]),
    ("closer", &["closer"]),
    ("prospector", &["prospector"]),
    ("origem_lead", &["origem"]),
    ("motivo_troca", &["motivo"]),
    ("situacao", &["situacao"]),
    ("grupo", &["grupo"]),
    ("codigo", &["=codigo", "=cod", "codigo do cliente", "cod cliente"]),
];

pub const SAIDA_FIELDS: Table = &[
    ("cnpj", &["cnpj"]),
    ("grupo", &["grupo"]),
    ("nome_fantasia", &["empresa", "=nome", "nome fantasia", "razao social"]),
    ("codigo", &["=codigo", "=cod"]),
    ("data_saida", &["data de saida", "data saida"]),
    ("ultima_competencia", &["ultima competencia"]),
    ("aviso_previo", &["aviso previo"]),
    ("servicos_contratados", &["servicos contratados"]),
    ("formalizacao_email", &["formalizacao"]),
    ("atualizacao_produtos_crm", &["atualizacao produtos", "atualizacao de produtos"]),
    ("atualizacao_cadastro_crm", &["atualizacao cadastro", "atualizacao de cadastro"]),
    ("ficha_saida", &["ficha de saida", "ficha saida"]),
    ("tarefas_saida", &["tarefas de saida", "tarefas saida"]),
    ("novo_responsavel_gestta", &["novo responsavel"]),
    ("distrato", &["distrato"]),
    ("motivo_saida", &["motivo"]),
    ("pendencias", &["pendencias"]),
    ("sem_contrato", &["sem contrato"]),
    ("bpo_financeiro", &["bpo financeiro"]),
    ("observacoes", &["observac"]),
];

pub const PRODUTOS_FIELDS: Table = &[
    ("codigo_produto_data", &["cod produto", "codigo produto data"]),
    ("nome_cliente", &["nome do cliente", "=cliente"]),
    ("grupo", &["grupo"]),
    ("regime_tributario", &["regime"]),
    ("situacao_produto", &["situacao"]),
    ("data_inicio", &["data inicio", "data de inicio"]),
    ("data_termino", &["data termino", "data de termino"]),
    ("tipo_produto", &["tipo de produto", "tipo produto"]),
    ("valor_produto", &["valor do produto", "valor produto"]),
    ("horas_contratadas", &["hrs contr", "horas contratadas"]),
    ("valor_hora", &["valor hora", "valor da hora"]),
    ("valor_vida", &["valor vida", "valor por vida"]),
    ("quantidade_vidas", &["qtd de vidas", "vidas"]),
    ("periodicidade", &["periodicidade"]),
    ("deadline", &["deadline"]),
    ("util_corrente", &["util ou corrente", "util corrente"]),
    ("observacao", &["observac"]),
    ("produto", &["produto"]),
    ("codigo", &["=codigo", "=cod", "codigo do cliente"]),
];

/// Field table of a source workbook
pub fn field_table(kind: SourceKind) -> FieldTable {
    FieldTable::from_static(match kind {
        SourceKind::Cadastro => CADASTRO_FIELDS,
        SourceKind::Saida => SAIDA_FIELDS,
        SourceKind::Produtos => PRODUTOS_FIELDS,
    })
}
