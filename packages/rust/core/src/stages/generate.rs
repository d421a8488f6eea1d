//! Generate stage: produce Mermaid markup for the prompt.

use tracing::{error, info};

use mermagen_llm::prompts::GENERATE_TEMPERATURE;
use mermagen_shared::{DiagramType, ExecutionMode, Result};

use crate::pipeline::PipelineDeps;
use crate::stages::clean_mermaid_code;
use crate::state::{PipelineState, StageUpdate};

/// Prompt substrings that select the large sample diagram in mock mode.
const LARGE_TRIGGER_WORDS: [&str; 7] =
    ["巨大", "大きい", "複雑", "large", "complex", "big", "huge"];

/// Generate markup for the detected type. Mock mode serves canned samples;
/// live mode calls the model and strips markdown fences. A failed call
/// leaves `mermaid_code` unset and records the error, counting the attempt.
pub(crate) async fn run(state: &PipelineState, deps: &PipelineDeps) -> StageUpdate {
    if deps.mode == ExecutionMode::Mock {
        return StageUpdate {
            mermaid_code: Some(Some(mock_diagram(&state.prompt, state.diagram_type).to_string())),
            attempts: Some(state.attempts + 1),
            ..Default::default()
        };
    }

    match ask_model(state, deps).await {
        Ok(content) => {
            info!(length = content.len(), "generation response received");
            StageUpdate {
                mermaid_code: Some(Some(clean_mermaid_code(&content))),
                attempts: Some(state.attempts + 1),
                ..Default::default()
            }
        }
        Err(err) => {
            error!(error = %err, "generation failed");
            StageUpdate {
                mermaid_code: Some(None),
                errors: Some(vec![err.to_string()]),
                attempts: Some(state.attempts + 1),
                ..Default::default()
            }
        }
    }
}

async fn ask_model(state: &PipelineState, deps: &PipelineDeps) -> Result<String> {
    let generator = deps.generator()?;
    let system = deps.templates.generate_system(state.diagram_type);
    generator
        .invoke(&system, &state.prompt, GENERATE_TEMPERATURE)
        .await
}

/// Canned diagram for a mock-mode run: the large sample when the prompt
/// carries a size trigger word, otherwise the per-type sample.
fn mock_diagram(prompt: &str, diagram_type: DiagramType) -> &'static str {
    let prompt_lower = prompt.to_lowercase();
    if LARGE_TRIGGER_WORDS.iter().any(|kw| prompt_lower.contains(kw)) {
        return LARGE_MOCK_FLOWCHART;
    }
    match diagram_type {
        DiagramType::Flowchart => MOCK_FLOWCHART,
        DiagramType::Sequence => MOCK_SEQUENCE,
        DiagramType::Gantt => MOCK_GANTT,
        DiagramType::Class => MOCK_CLASS,
        DiagramType::Er => MOCK_ER,
        DiagramType::State => MOCK_STATE,
        DiagramType::Journey => MOCK_JOURNEY,
    }
}

const MOCK_FLOWCHART: &str = "flowchart TD
    A[開始] --> B{条件分岐}
    B -->|Yes| C[処理A]
    B -->|No| D[処理B]
    C --> E[終了]
    D --> E";

const MOCK_SEQUENCE: &str = "sequenceDiagram
    participant U as ユーザー
    participant S as サーバー
    participant D as データベース
    U->>S: リクエスト送信
    S->>D: データ取得
    D-->>S: データ返却
    S-->>U: レスポンス返却";

const MOCK_GANTT: &str = "gantt
    title プロジェクトスケジュール
    dateFormat YYYY-MM-DD
    section 計画
        要件定義: a1, 2024-01-01, 7d
        設計: a2, after a1, 14d
    section 開発
        実装: a3, after a2, 21d
        テスト: a4, after a3, 14d";

const MOCK_CLASS: &str = "classDiagram
    class User {
        +String name
        +String email
        +login()
        +logout()
    }
    class Order {
        +int id
        +Date date
        +calculate()
    }
    User \"1\" --> \"*\" Order : places";

const MOCK_ER: &str = "erDiagram
    USER ||--o{ ORDER : places
    USER {
        int id PK
        string name
        string email
    }
    ORDER {
        int id PK
        date created_at
        int user_id FK
    }";

const MOCK_STATE: &str = "stateDiagram-v2
    [*] --> Idle
    Idle --> Processing : start
    Processing --> Success : complete
    Processing --> Error : fail
    Success --> [*]
    Error --> Idle : retry";

const MOCK_JOURNEY: &str = "journey
    title ユーザー登録フロー
    section 登録
        フォーム入力: 5: User
        確認メール受信: 3: User
        メール確認: 4: User
    section 利用開始
        ログイン: 5: User
        プロフィール設定: 4: User";

/// Multi-subgraph sample for exercising large-diagram rendering paths.
const LARGE_MOCK_FLOWCHART: &str = "flowchart TD
    subgraph Frontend[\"フロントエンド\"]
        A[ユーザー入力] --> B{入力検証}
        B -->|有効| C[API呼び出し]
        B -->|無効| D[エラー表示]
        D --> A
        C --> E{レスポンス確認}
        E -->|成功| F[状態更新]
        E -->|エラー| G[エラーハンドリング]
        G --> H{リトライ?}
        H -->|はい| C
        H -->|いいえ| D
        F --> I[UI更新]
        I --> J[完了通知]
    end

    subgraph Backend[\"バックエンド\"]
        K[APIエンドポイント] --> L{認証確認}
        L -->|認証済み| M[リクエスト解析]
        L -->|未認証| N[401エラー]
        M --> O{バリデーション}
        O -->|有効| P[ビジネスロジック]
        O -->|無効| Q[400エラー]
        P --> R{DB操作}
        R -->|成功| S[レスポンス生成]
        R -->|失敗| T[500エラー]
        S --> U[ログ記録]
        U --> V[レスポンス送信]
    end

    subgraph Database[\"データベース\"]
        W[(PostgreSQL)] --> X{クエリ実行}
        X -->|SELECT| Y[データ取得]
        X -->|INSERT| Z[データ挿入]
        X -->|UPDATE| AA[データ更新]
        X -->|DELETE| AB[データ削除]
        Y --> AC{キャッシュ確認}
        AC -->|ヒット| AD[キャッシュ返却]
        AC -->|ミス| AE[DB読み込み]
        AE --> AF[キャッシュ更新]
        AF --> AD
    end

    subgraph External[\"外部サービス\"]
        AG[OpenAI API] --> AH{レート制限}
        AH -->|OK| AI[リクエスト処理]
        AH -->|制限中| AJ[待機/リトライ]
        AJ --> AH
        AI --> AK[レスポンス生成]
        AK --> AL{検証}
        AL -->|有効| AM[結果返却]
        AL -->|無効| AN[再生成]
        AN --> AI
    end

    C --> K
    V --> E
    P --> W
    P --> AG
    AM --> S";
